//! Error types for pixstash
//!
//! All modules use `StashResult<T>` as their return type.

use crate::cache::EntryStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pixstash operations
pub type StashResult<T> = Result<T, StashError>;

/// Coarse classification of a [`StashError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Remote source unreachable, non-success response or interrupted transfer
    Fetch,
    /// Local filesystem failure (permissions, disk full, bad path)
    Filesystem,
    /// Entry out of range or not resolved yet
    NotFound,
    /// Every item of a batch operation failed
    Batch,
    /// Invalid configuration or key list
    Config,
    /// Anything else
    Other,
}

/// All errors that can occur in pixstash
#[derive(Error, Debug)]
pub enum StashError {
    // Fetch errors
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Fetch of {url} returned HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Fetch of {url} timed out after {secs}s")]
    FetchTimeout { url: String, secs: u64 },

    #[error("Transfer of {url} truncated: expected {expected} bytes, got {actual}")]
    FetchTruncated {
        url: String,
        expected: u64,
        actual: u64,
    },

    // Filesystem errors
    #[error("Filesystem error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Lookup errors
    #[error("Entry {index} is out of range ({len} sources configured)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Entry {index} is not resolved yet (status: {status})")]
    EntryUnresolved { index: usize, status: EntryStatus },

    // Batch errors
    #[error("All {count} {operation} operations failed")]
    AllFailed {
        operation: &'static str,
        count: usize,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid source URL {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Two sources map to the same cache file: {name}")]
    DuplicateTarget { name: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl StashError {
    /// Create a filesystem error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a generic fetch error
    pub fn fetch(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Fetch { .. }
            | Self::FetchStatus { .. }
            | Self::FetchTimeout { .. }
            | Self::FetchTruncated { .. } => ErrorKind::Fetch,
            Self::Io { .. } => ErrorKind::Filesystem,
            Self::IndexOutOfRange { .. } | Self::EntryUnresolved { .. } => ErrorKind::NotFound,
            Self::AllFailed { .. } => ErrorKind::Batch,
            Self::ConfigInvalid { .. }
            | Self::ConfigDirCreate { .. }
            | Self::InvalidKey { .. }
            | Self::DuplicateTarget { .. } => ErrorKind::Config,
            _ => ErrorKind::Other,
        }
    }

    /// Check if retrying the same operation could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch { .. } | Self::FetchTimeout { .. } | Self::FetchTruncated { .. } => true,
            Self::FetchStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::IndexOutOfRange { .. } => Some("Run: pixstash populate to list entries"),
            Self::EntryUnresolved { .. } => Some("The source failed to download; run: pixstash populate -v"),
            Self::FetchTimeout { .. } => Some("Raise fetch.timeout_secs in the config"),
            Self::AllFailed { .. } => Some("Check network access and the configured sources"),
            Self::DuplicateTarget { .. } => Some("Use cache.naming = \"index\" or remove duplicate sources"),
            _ => None,
        }
    }
}
