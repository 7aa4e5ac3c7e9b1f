//! Per-target async locks
//!
//! One lock per cache file path. Holding it makes check-then-fetch and
//! delete atomic with respect to other operations on the same file while
//! leaving unrelated files independent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily populated table of per-path locks
#[derive(Debug, Default)]
pub struct TargetLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `target`
    pub async fn acquire(&self, target: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            // A poisoned map is still structurally valid
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                locks
                    .entry(target.to_path_buf())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of distinct targets seen so far
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
