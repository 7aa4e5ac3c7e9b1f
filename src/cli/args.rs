//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pixstash - local cache for remote images
///
/// Keeps one local copy of every configured source, reports whether each was
/// fetched or already cached, and exports copies on request.
#[derive(Parser, Debug)]
#[command(name = "pixstash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PIXSTASH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cache every configured source and show its status
    Populate(PopulateArgs),

    /// Copy cached images to the export directory
    Export(ExportArgs),

    /// Delete cached images and fetch them again
    Clear(ClearArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the populate command
#[derive(Parser, Debug)]
pub struct PopulateArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Index of the entry to export
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub index: Option<usize>,

    /// Export every cached entry
    #[arg(short, long)]
    pub all: bool,

    /// Destination directory (overrides export.dir)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Only delete, do not fetch again
    #[arg(long)]
    pub no_refetch: bool,

    /// Output format for the repopulated snapshot
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.dir)
        key: String,

        /// Value to set
        value: String,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_requires_index_or_all() {
        assert!(Cli::try_parse_from(["pixstash", "export"]).is_err());
        assert!(Cli::try_parse_from(["pixstash", "export", "2", "--all"]).is_err());

        let cli = Cli::try_parse_from(["pixstash", "export", "--all", "--dest", "/tmp/out"]).unwrap();
        match cli.command {
            Commands::Export(args) => {
                assert!(args.all);
                assert_eq!(args.dest, Some(PathBuf::from("/tmp/out")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn verbose_counts() {
        let cli = Cli::try_parse_from(["pixstash", "-vv", "populate"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
