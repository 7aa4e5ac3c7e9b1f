//! Filesystem-backed cache store
//!
//! Stateless apart from the per-target lock table: the directory itself is
//! the source of truth for what is cached.

use crate::cache::fetch::{partial_path, Fetcher};
use crate::cache::key::CacheKey;
use crate::cache::locks::TargetLocks;
use crate::error::{StashError, StashResult};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Result of [`CacheStore::ensure`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured {
    /// Local file holding the source's content
    pub path: PathBuf,
    /// True if the file already existed and no fetch happened
    pub was_present: bool,
}

/// Maps keys to local files, fetching only when a file is absent
pub struct CacheStore {
    fetcher: Arc<dyn Fetcher>,
    locks: TargetLocks,
}

impl CacheStore {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            locks: TargetLocks::new(),
        }
    }

    /// Make sure `target` holds the content of `key`
    ///
    /// Calls for the same target are serialised: a caller that arrives while
    /// a fetch is in flight waits for it, then finds the file and reports it
    /// as already present. At most one fetch per target runs at a time.
    pub async fn ensure(&self, key: &CacheKey, target: &Path) -> StashResult<Ensured> {
        let _guard = self.locks.acquire(target).await;

        if exists(target).await? {
            debug!("Cache hit for {} at {}", key, target.display());
            return Ok(Ensured {
                path: target.to_path_buf(),
                was_present: true,
            });
        }

        if let Some(parent) = target.parent() {
            ensure_dir(parent).await?;
        }

        debug!("Cache miss for {}, fetching via {}", key, self.fetcher.name());
        self.fetcher.fetch(key, target).await?;

        Ok(Ensured {
            path: target.to_path_buf(),
            was_present: false,
        })
    }

    /// Remove a cached file (and any leftover partial download)
    ///
    /// Returns whether a file was removed. Missing files are not an error.
    pub async fn delete(&self, path: &Path) -> StashResult<bool> {
        let _guard = self.locks.acquire(path).await;

        remove_if_present(&partial_path(path)).await?;
        let removed = remove_if_present(path).await?;
        if removed {
            debug!("Removed {}", path.display());
        }
        Ok(removed)
    }

    /// Copy a cached file to `dest_dir/file_name`, creating `dest_dir` if needed
    pub async fn copy_to(
        &self,
        source: &Path,
        dest_dir: &Path,
        file_name: &str,
    ) -> StashResult<PathBuf> {
        ensure_dir(dest_dir).await?;

        let dest = dest_dir.join(file_name);
        fs::copy(source, &dest).await.map_err(|e| {
            StashError::io(
                format!("copying {} to {}", source.display(), dest.display()),
                e,
            )
        })?;

        debug!("Exported {} -> {}", source.display(), dest.display());
        Ok(dest)
    }
}

/// Whether `path` exists as a regular file
pub async fn exists(path: &Path) -> StashResult<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StashError::io(format!("checking {}", path.display()), e)),
    }
}

/// Create a directory tree; concurrent callers and existing directories are fine
async fn ensure_dir(dir: &Path) -> StashResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| StashError::io(format!("creating directory {}", dir.display()), e))
}

async fn remove_if_present(path: &Path) -> StashResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StashError::io(format!("removing {}", path.display()), e)),
    }
}
