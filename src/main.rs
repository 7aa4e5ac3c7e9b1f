//! Pixstash - local cache for remote images
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pixstash::cli::{Cli, Commands};
use pixstash::config::{Config, ConfigManager};
use pixstash::error::StashResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StashResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Populate(args) => pixstash::cli::commands::populate(args, &config).await,
        Commands::Export(args) => pixstash::cli::commands::export(args, &config).await,
        Commands::Clear(args) => pixstash::cli::commands::clear(args, &config).await,
        Commands::Config(args) => {
            pixstash::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug; logs go to stderr
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("pixstash=warn"),
        1 => EnvFilter::new("pixstash=info"),
        _ => EnvFilter::new("pixstash=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
