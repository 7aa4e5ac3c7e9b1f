//! Configuration schema for pixstash
//!
//! Configuration is stored at `~/.config/pixstash/config.toml`

use crate::cache::{CacheKey, FileNaming};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder images shipped as the default source list
pub const DEFAULT_SOURCES: [&str; 8] = [
    "https://dummyimage.com/600x400/000/fff&text=01",
    "https://dummyimage.com/600x400/000/fff&text=02",
    "https://dummyimage.com/600x400/000/fff&text=03",
    "https://dummyimage.com/600x400/000/fff&text=04",
    "https://dummyimage.com/600x400/000/fff&text=05",
    "https://dummyimage.com/600x400/000/fff&text=06",
    "https://dummyimage.com/600x400/000/fff&text=07",
    "https://dummyimage.com/600x400/000/fff&text=08",
];

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache contents and layout
    pub cache: CacheConfig,

    /// Remote fetch settings
    pub fetch: FetchConfig,

    /// Export destination
    pub export: ExportConfig,
}

impl Config {
    /// Check values serde cannot: source URLs, extension and log format
    pub fn validate(&self) -> Result<(), String> {
        if let Err(e) = CacheKey::parse_all(&self.cache.sources) {
            return Err(e.to_string());
        }

        let ext = &self.cache.extension;
        if ext.is_empty() || ext.contains(['/', '\\', '.']) {
            return Err(format!("cache.extension {:?} must be a bare extension like \"jpg\"", ext));
        }

        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format {:?} must be \"text\" or \"json\"",
                self.general.log_format
            ));
        }

        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Source URLs, in display order
    pub sources: Vec<String>,

    /// Cache directory (default: platform temp dir + "pixstash")
    pub dir: Option<PathBuf>,

    /// File naming scheme: "index" or "hash"
    pub naming: FileNaming,

    /// Extension of cached files
    pub extension: String,

    /// Maximum concurrent fetches (0 = one task per source)
    pub max_concurrent: usize,

    /// Delete cached files when the process exits
    pub clear_on_exit: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            dir: None,
            naming: FileNaming::Index,
            extension: "jpg".to_string(),
            max_concurrent: 0,
            clear_on_exit: false,
        }
    }
}

impl CacheConfig {
    /// Cache directory with the platform default applied
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pixstash"))
    }
}

/// Remote fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-fetch timeout covering connect and transfer
    pub timeout_secs: u64,

    /// User-Agent header sent with HTTP requests
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("pixstash/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Export directory (default: platform downloads dir)
    pub dir: Option<PathBuf>,
}

impl ExportConfig {
    /// Export directory with the platform default applied
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .or_else(dirs::download_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
            .unwrap_or_else(|| PathBuf::from("downloads"))
    }
}
