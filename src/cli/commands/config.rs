//! Config command - show or edit configuration

use crate::cache::FileNaming;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{StashError, StashResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: [&str; 10] = [
    "general.log_format",
    "cache.sources",
    "cache.dir",
    "cache.naming",
    "cache.extension",
    "cache.max_concurrent",
    "cache.clear_on_exit",
    "fetch.timeout_secs",
    "fetch.user_agent",
    "export.dir",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> StashResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let ctx = UiContext::detect();
            if !VALID_KEYS.contains(&key.as_str()) {
                ui::step_error_detail(&ctx, "Unknown config key", &key);
                ui::remark(&ctx, "Valid keys:");
                for key in VALID_KEYS {
                    eprintln!("  {}", key);
                }
                return Err(StashError::User(format!("Unknown config key: {}", key)));
            }

            let mut updated = config.clone();
            apply(&mut updated, &key, &value)?;
            updated.validate().map_err(StashError::User)?;
            manager.save(&updated).await?;
            ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> StashResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> StashResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Set a dot-separated key on `config`
fn apply(config: &mut Config, key: &str, value: &str) -> StashResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => {
            config.general.log_format = match value {
                "text" | "json" => value.to_string(),
                _ => return Err(invalid(value, "text or json")),
            }
        }

        ["cache", "sources"] => {
            config.cache.sources = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        ["cache", "dir"] => config.cache.dir = optional_path(value),
        ["cache", "naming"] => {
            config.cache.naming = match value {
                "index" => FileNaming::Index,
                "hash" => FileNaming::Hash,
                _ => return Err(invalid(value, "index or hash")),
            }
        }
        ["cache", "extension"] => {
            config.cache.extension = value.trim_start_matches('.').to_string()
        }
        ["cache", "max_concurrent"] => config.cache.max_concurrent = parse_number(value)?,
        ["cache", "clear_on_exit"] => config.cache.clear_on_exit = parse_bool(value)?,

        ["fetch", "timeout_secs"] => config.fetch.timeout_secs = parse_number(value)?,
        ["fetch", "user_agent"] => config.fetch.user_agent = value.to_string(),

        ["export", "dir"] => config.export.dir = optional_path(value),

        _ => return Err(StashError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

/// An empty value restores the platform default
fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

fn parse_bool(value: &str) -> StashResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(value, "true or false")),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> StashResult<T> {
    value
        .parse()
        .map_err(|_| StashError::User(format!("Invalid number: {}", value)))
}

fn invalid(value: &str, expected: &str) -> StashError {
    StashError::User(format!("Invalid value {:?}, expected {}", value, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_known_keys() {
        let mut config = Config::default();

        apply(&mut config, "cache.sources", "https://a.test/1.png, https://a.test/2.png,").unwrap();
        apply(&mut config, "cache.naming", "hash").unwrap();
        apply(&mut config, "cache.extension", ".png").unwrap();
        apply(&mut config, "cache.max_concurrent", "4").unwrap();
        apply(&mut config, "cache.clear_on_exit", "yes").unwrap();
        apply(&mut config, "fetch.timeout_secs", "10").unwrap();
        apply(&mut config, "export.dir", "/tmp/out").unwrap();

        assert_eq!(config.cache.sources.len(), 2);
        assert_eq!(config.cache.naming, FileNaming::Hash);
        assert_eq!(config.cache.extension, "png");
        assert_eq!(config.cache.max_concurrent, 4);
        assert!(config.cache.clear_on_exit);
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.export.dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn empty_dir_restores_default() {
        let mut config = Config::default();
        apply(&mut config, "cache.dir", "/var/cache/pixstash").unwrap();
        apply(&mut config, "cache.dir", "").unwrap();
        assert_eq!(config.cache.dir, None);
    }

    #[test]
    fn apply_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply(&mut config, "cache.colour", "red").is_err());
        assert!(apply(&mut config, "cache.naming", "random").is_err());
        assert!(apply(&mut config, "fetch.timeout_secs", "soon").is_err());
        assert!(apply(&mut config, "general.log_format", "xml").is_err());
    }
}
