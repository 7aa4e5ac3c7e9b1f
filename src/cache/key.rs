//! Cache keys and deterministic file naming
//!
//! A key is the source URL of a cached item. The local file name is derived
//! from the key's position in the configured list (or from a hash of the URL),
//! never from anything that changes during the run.

use crate::error::{StashError, StashResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Supported source schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceScheme {
    /// Plain HTTP
    Http,
    /// HTTP over TLS
    Https,
    /// Local file (mirrors, fixtures)
    File,
}

impl SourceScheme {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Http => "http://",
            Self::Https => "https://",
            Self::File => "file://",
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Https, Self::Http, Self::File]
    }
}

/// Stable identifier of a remote item: its source URL
///
/// Cloning is cheap; the URL is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    url: Arc<str>,
    scheme: SourceScheme,
}

impl CacheKey {
    /// Parse and validate a source URL
    pub fn parse(raw: &str) -> StashResult<Self> {
        let invalid = |reason: &str| StashError::InvalidKey {
            key: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("empty URL"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid("URL contains whitespace"));
        }

        let lower = raw.to_ascii_lowercase();
        let scheme = SourceScheme::all()
            .iter()
            .copied()
            .find(|s| lower.starts_with(s.prefix()))
            .ok_or_else(|| invalid("unsupported scheme (expected http, https or file)"))?;

        if raw.len() == scheme.prefix().len() {
            return Err(invalid("URL has no host or path"));
        }

        Ok(Self {
            url: Arc::from(raw),
            scheme,
        })
    }

    /// Parse every URL of a configured list, preserving order
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> StashResult<Vec<Self>> {
        raw.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    /// The source URL
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The URL scheme
    pub fn scheme(&self) -> SourceScheme {
        self.scheme
    }

    /// Local path for `file://` keys
    pub fn file_path(&self) -> Option<PathBuf> {
        match self.scheme {
            SourceScheme::File => Some(PathBuf::from(&self.url[self.scheme.prefix().len()..])),
            _ => None,
        }
    }

    /// First 16 hex chars of the SHA-256 of the URL
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// How cached files are named inside the cache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNaming {
    /// `image_<index>.<ext>`, index = position in the source list
    #[default]
    Index,
    /// `<url digest>.<ext>`
    Hash,
}

impl FileNaming {
    /// Derive the cache file name for the key at `index`
    pub fn file_name(&self, index: usize, key: &CacheKey, extension: &str) -> String {
        let ext = extension.trim_start_matches('.');
        match self {
            Self::Index => format!("image_{}.{}", index, ext),
            Self::Hash => format!("{}.{}", key.digest(), ext),
        }
    }
}

impl fmt::Display for FileNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => write!(f, "index"),
            Self::Hash => write!(f, "hash"),
        }
    }
}
