//! Per-key resolution state and ordered snapshots

use crate::cache::key::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Resolution status of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Not resolved yet in this session (or in flight)
    Pending,
    /// Local file existed before it was requested
    Cached,
    /// Local file was just downloaded
    Fetched,
    /// Last attempt failed
    Failed,
}

impl EntryStatus {
    /// Whether the entry has a usable local file
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Cached | Self::Fetched)
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Cached => write!(f, "cached"),
            Self::Fetched => write!(f, "fetched"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Status and its payload together, so a path exists iff the entry is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Pending,
    Cached(PathBuf),
    Fetched(PathBuf),
    Failed(String),
}

/// The cache manager's record of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    key: CacheKey,
    resolution: Resolution,
    updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// A fresh, unresolved entry
    pub fn pending(key: CacheKey) -> Self {
        Self {
            key,
            resolution: Resolution::Pending,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn status(&self) -> EntryStatus {
        match self.resolution {
            Resolution::Pending => EntryStatus::Pending,
            Resolution::Cached(_) => EntryStatus::Cached,
            Resolution::Fetched(_) => EntryStatus::Fetched,
            Resolution::Failed(_) => EntryStatus::Failed,
        }
    }

    /// Local file, present only for `Cached` and `Fetched`
    pub fn local_path(&self) -> Option<&Path> {
        match &self.resolution {
            Resolution::Cached(p) | Resolution::Fetched(p) => Some(p),
            _ => None,
        }
    }

    /// Recorded failure message, present only for `Failed`
    pub fn error(&self) -> Option<&str> {
        match &self.resolution {
            Resolution::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// When the entry last changed state
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn resolve(&mut self, path: PathBuf, was_present: bool) {
        self.resolution = if was_present {
            Resolution::Cached(path)
        } else {
            Resolution::Fetched(path)
        };
        self.updated_at = Utc::now();
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.resolution = Resolution::Failed(message);
        self.updated_at = Utc::now();
    }

    pub(crate) fn reset(&mut self) {
        if self.resolution != Resolution::Pending {
            self.resolution = Resolution::Pending;
            self.updated_at = Utc::now();
        }
    }
}

/// Ordered entries, one per configured key
///
/// Index `i` refers to the same key for the lifetime of the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    entries: Vec<CacheEntry>,
}

impl CacheSnapshot {
    /// All-pending snapshot for the given keys
    pub fn new(keys: &[CacheKey]) -> Self {
        Self {
            entries: keys.iter().cloned().map(CacheEntry::pending).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CacheEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.iter()
    }

    /// Status of every entry, in index order
    pub fn statuses(&self) -> Vec<EntryStatus> {
        self.entries.iter().map(CacheEntry::status).collect()
    }

    /// Number of entries with the given status
    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    /// True once no entry is pending
    pub fn is_settled(&self) -> bool {
        self.count(EntryStatus::Pending) == 0
    }

    pub(crate) fn entry_mut(&mut self, index: usize) -> Option<&mut CacheEntry> {
        self.entries.get_mut(index)
    }

    pub(crate) fn reset_all(&mut self) {
        for entry in &mut self.entries {
            entry.reset();
        }
    }
}

impl<'a> IntoIterator for &'a CacheSnapshot {
    type Item = &'a CacheEntry;
    type IntoIter = std::slice::Iter<'a, CacheEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
