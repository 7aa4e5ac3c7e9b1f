//! Batch orchestration over the cache store
//!
//! The coordinator owns the only [`CacheSnapshot`]. Every per-key task writes
//! its own entry exactly once, from its own result, through a weak handle, so
//! results of a batch that was superseded by a clear (or of a coordinator
//! that has been torn down) are dropped instead of applied.
//!
//! # Entry lifecycle
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Pending | ensure ok, file existed | Cached |
//! | Pending | ensure ok, file fetched | Fetched |
//! | Pending | ensure failed | Failed |
//! | any | clear / new populate | Pending |

use crate::cache::entry::{CacheSnapshot, EntryStatus};
use crate::cache::fetch::{partial_path, SourceFetcher};
use crate::cache::key::{CacheKey, FileNaming};
use crate::cache::store::{CacheStore, Ensured};
use crate::config::Config;
use crate::error::{StashError, StashResult};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, OwnedRwLockReadGuard, RwLock, Semaphore};
use tracing::{debug, info, warn};

/// Construction options for [`CacheCoordinator`]
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Directory holding cached files
    pub cache_dir: PathBuf,
    /// Destination of export operations
    pub export_dir: PathBuf,
    /// File naming scheme inside `cache_dir`
    pub naming: FileNaming,
    /// Extension of cached files
    pub extension: String,
    /// Maximum concurrent fetches per populate (0 = unbounded)
    pub max_concurrent: usize,
    /// Run the teardown delete phase when the coordinator is dropped
    pub clear_on_drop: bool,
}

impl CoordinatorOptions {
    pub fn new(cache_dir: impl Into<PathBuf>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            export_dir: export_dir.into(),
            naming: FileNaming::Index,
            extension: "jpg".to_string(),
            max_concurrent: 0,
            clear_on_drop: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_dir: config.cache.resolved_dir(),
            export_dir: config.export.resolved_dir(),
            naming: config.cache.naming,
            extension: config.cache.extension.clone(),
            max_concurrent: config.cache.max_concurrent,
            clear_on_drop: config.cache.clear_on_exit,
        }
    }
}

/// Outcome of exporting one entry
#[derive(Debug)]
pub struct ExportOutcome {
    pub index: usize,
    pub key: CacheKey,
    pub result: StashResult<PathBuf>,
}

/// Outcome of a delete phase
#[derive(Debug, Default)]
pub struct ClearReport {
    /// Files that existed and were removed
    pub removed: usize,
    /// Per-index delete failures (the phase continues past them)
    pub failures: Vec<(usize, StashError)>,
}

/// State shared with in-flight per-key tasks
struct Shared {
    snapshot: watch::Sender<CacheSnapshot>,
    closed: AtomicBool,
    generation: AtomicU64,
}

impl Shared {
    /// Record one key's outcome unless its batch is stale
    ///
    /// Runs inside the watch lock, so it cannot interleave with a
    /// generation bump or a close.
    fn apply(&self, generation: u64, index: usize, outcome: Result<Ensured, String>) {
        let applied = self.snapshot.send_if_modified(|snapshot| {
            if self.closed.load(Ordering::SeqCst)
                || self.generation.load(Ordering::SeqCst) != generation
            {
                return false;
            }
            let Some(entry) = snapshot.entry_mut(index) else {
                return false;
            };
            match outcome {
                Ok(ensured) => entry.resolve(ensured.path, ensured.was_present),
                Err(message) => entry.fail(message),
            }
            true
        });

        if !applied {
            debug!("Discarded stale result for entry {}", index);
        }
    }

    /// Invalidate every in-flight batch
    fn bump_generation(&self) {
        self.snapshot.send_if_modified(|_| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
    }

    fn close(&self) {
        self.snapshot.send_if_modified(|_| {
            self.closed.store(true, Ordering::SeqCst);
            false
        });
    }
}

/// Drives the cache store across the configured key list
pub struct CacheCoordinator {
    keys: Arc<[CacheKey]>,
    targets: Arc<[PathBuf]>,
    store: Arc<CacheStore>,
    shared: Arc<Shared>,
    // populate/export take it shared, clear takes it exclusive
    gate: Arc<RwLock<()>>,
    limiter: Option<Arc<Semaphore>>,
    // set once teardown deletes files; late fetches remove what they wrote
    purged: Arc<AtomicBool>,
    export_dir: PathBuf,
    clear_on_drop: bool,
    torn_down: bool,
}

impl CacheCoordinator {
    /// Create a coordinator for `keys`
    ///
    /// Fails with [`StashError::DuplicateTarget`] if two keys would share a
    /// cache file.
    pub fn new(
        keys: Vec<CacheKey>,
        store: CacheStore,
        options: CoordinatorOptions,
    ) -> StashResult<Self> {
        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            let name = options.naming.file_name(index, key, &options.extension);
            if !seen.insert(name.clone()) {
                return Err(StashError::DuplicateTarget { name });
            }
            targets.push(options.cache_dir.join(name));
        }

        let (snapshot, _) = watch::channel(CacheSnapshot::new(&keys));
        let limiter = (options.max_concurrent > 0)
            .then(|| Arc::new(Semaphore::new(options.max_concurrent)));

        debug!(
            "Coordinator for {} sources in {}",
            keys.len(),
            options.cache_dir.display()
        );

        Ok(Self {
            keys: keys.into(),
            targets: targets.into(),
            store: Arc::new(store),
            shared: Arc::new(Shared {
                snapshot,
                closed: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
            gate: Arc::new(RwLock::new(())),
            limiter,
            purged: Arc::new(AtomicBool::new(false)),
            export_dir: options.export_dir,
            clear_on_drop: options.clear_on_drop,
            torn_down: false,
        })
    }

    /// Create a coordinator backed by [`SourceFetcher`] from configuration
    pub fn from_config(config: &Config) -> StashResult<Self> {
        let keys = CacheKey::parse_all(&config.cache.sources)?;
        let store = CacheStore::new(Arc::new(SourceFetcher::new(&config.fetch)));
        Self::new(keys, store, CoordinatorOptions::from_config(config))
    }

    /// Configured keys in index order
    pub fn keys(&self) -> &[CacheKey] {
        &self.keys
    }

    /// Deterministic cache file of the key at `index`
    pub fn target_path(&self, index: usize) -> Option<&Path> {
        self.targets.get(index).map(PathBuf::as_path)
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Copy of the current snapshot
    pub fn current_snapshot(&self) -> CacheSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Receive a new snapshot after every entry transition
    pub fn subscribe(&self) -> watch::Receiver<CacheSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Ensure every key has a local copy, concurrently
    ///
    /// Per-key failures are recorded on their entries. Fails only if every
    /// key failed.
    pub async fn populate_all(&self) -> StashResult<CacheSnapshot> {
        let gate = Arc::new(Arc::clone(&self.gate).read_owned().await);
        self.populate_inner(Some(gate)).await
    }

    async fn populate_inner(
        &self,
        gate: Option<Arc<OwnedRwLockReadGuard<()>>>,
    ) -> StashResult<CacheSnapshot> {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.shared.snapshot.send_modify(CacheSnapshot::reset_all);

        let handles: Vec<_> = (0..self.keys.len())
            .map(|index| {
                let key = self.keys[index].clone();
                let target = self.targets[index].clone();
                let store = Arc::clone(&self.store);
                let shared: Weak<Shared> = Arc::downgrade(&self.shared);
                let purged = Arc::clone(&self.purged);
                let limiter = self.limiter.clone();
                let gate = gate.clone();

                // Spawned so an abandoned populate lets fetches finish on their own
                tokio::spawn(async move {
                    let _gate = gate;
                    let permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.map(Some),
                        None => Ok(None),
                    };

                    let outcome: Result<Ensured, String> = match permit {
                        Err(e) => Err(e.to_string()),
                        Ok(_) if purged.load(Ordering::SeqCst) => {
                            Err("coordinator torn down".to_string())
                        }
                        Ok(_permit) => {
                            let outcome = store.ensure(&key, &target).await.map_err(|e| {
                                let kind = if e.is_retryable() { "transient" } else { "permanent" };
                                warn!("Failed to cache {} ({}): {}", key, kind, e);
                                e.to_string()
                            });

                            // Teardown may have deleted the target while this fetch was running
                            if purged.load(Ordering::SeqCst) {
                                if let Err(e) = store.delete(&target).await {
                                    warn!(
                                        "Failed to remove {} after teardown: {}",
                                        target.display(),
                                        e
                                    );
                                }
                            }
                            outcome
                        }
                    };

                    match shared.upgrade() {
                        Some(shared) => shared.apply(generation, index, outcome.clone()),
                        None => debug!("Coordinator gone, dropping result for {}", key),
                    }
                    outcome
                })
            })
            .collect();

        let results = join_all(handles).await;

        // Built from this call's own outcomes; an overlapping populate may
        // have relabelled the shared snapshot in the meantime
        let mut snapshot = CacheSnapshot::new(&self.keys);
        let mut failed = 0;
        for (index, result) in results.into_iter().enumerate() {
            let outcome = result.unwrap_or_else(|e| {
                let message = format!("task aborted: {}", e);
                self.shared.apply(generation, index, Err(message.clone()));
                Err(message)
            });

            let Some(entry) = snapshot.entry_mut(index) else {
                continue;
            };
            match outcome {
                Ok(ensured) => entry.resolve(ensured.path, ensured.was_present),
                Err(message) => {
                    failed += 1;
                    entry.fail(message);
                }
            }
        }

        info!(
            "Populated {} entries: {} fetched, {} cached, {} failed",
            snapshot.len(),
            snapshot.count(EntryStatus::Fetched),
            snapshot.count(EntryStatus::Cached),
            failed
        );

        if !self.keys.is_empty() && failed == self.keys.len() {
            return Err(StashError::AllFailed {
                operation: "populate",
                count: failed,
            });
        }
        Ok(snapshot)
    }

    /// Copy the cached file of entry `index` to the export directory
    pub async fn export_one(&self, index: usize) -> StashResult<PathBuf> {
        let _gate = self.gate.read().await;
        self.export_inner(index).await
    }

    async fn export_inner(&self, index: usize) -> StashResult<PathBuf> {
        let source = self.resolved_path(index)?;
        let file_name = self.targets[index]
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StashError::Internal(format!("cache path for entry {} has no file name", index)))?;

        self.store
            .copy_to(&source, &self.export_dir, &file_name)
            .await
    }

    fn resolved_path(&self, index: usize) -> StashResult<PathBuf> {
        let snapshot = self.shared.snapshot.borrow();
        let entry = snapshot.get(index).ok_or(StashError::IndexOutOfRange {
            index,
            len: snapshot.len(),
        })?;
        entry
            .local_path()
            .map(Path::to_path_buf)
            .ok_or(StashError::EntryUnresolved {
                index,
                status: entry.status(),
            })
    }

    /// Export every entry concurrently, one outcome per key in index order
    ///
    /// Unresolved entries yield a not-found outcome. Fails only if every
    /// export failed.
    pub async fn export_all(&self) -> StashResult<Vec<ExportOutcome>> {
        let _gate = self.gate.read().await;

        let outcomes: Vec<ExportOutcome> = join_all(self.keys.iter().enumerate().map(
            |(index, key)| async move {
                ExportOutcome {
                    index,
                    key: key.clone(),
                    result: self.export_inner(index).await,
                }
            },
        ))
        .await;

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            "Exported {} of {} entries to {}",
            outcomes.len() - failed,
            outcomes.len(),
            self.export_dir.display()
        );

        if !outcomes.is_empty() && failed == outcomes.len() {
            return Err(StashError::AllFailed {
                operation: "export",
                count: failed,
            });
        }
        Ok(outcomes)
    }

    /// Delete every cached file and reset all entries to pending
    pub async fn clear(&self) -> ClearReport {
        let _gate = self.gate.write().await;
        self.clear_inner().await
    }

    async fn clear_inner(&self) -> ClearReport {
        self.shared.bump_generation();
        let report = self.delete_phase().await;
        self.shared.snapshot.send_modify(CacheSnapshot::reset_all);
        report
    }

    /// Delete every cached file, then populate again
    ///
    /// All deletions complete before the first fetch starts.
    pub async fn clear_and_repopulate(&self) -> StashResult<CacheSnapshot> {
        let _gate = self.gate.write().await;
        self.clear_inner().await;
        self.populate_inner(None).await
    }

    async fn delete_phase(&self) -> ClearReport {
        let results = join_all(
            self.targets
                .iter()
                .enumerate()
                .map(|(index, target)| async move { (index, self.store.delete(target).await) }),
        )
        .await;

        let mut report = ClearReport::default();
        for (index, result) in results {
            match result {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to delete cache entry {}: {}", index, e);
                    report.failures.push((index, e));
                }
            }
        }

        info!(
            "Cleared cache: {} removed, {} failed",
            report.removed,
            report.failures.len()
        );
        report
    }

    /// Tear down: stop applying results and delete cached files
    ///
    /// Starts no new fetches. Fetches still in flight finish on their own,
    /// their results are discarded and their files removed.
    pub async fn shutdown(mut self) -> ClearReport {
        self.shared.close();
        self.purged.store(true, Ordering::SeqCst);
        let report = self.delete_phase().await;
        self.torn_down = true;
        report
    }
}

impl Drop for CacheCoordinator {
    fn drop(&mut self) {
        self.shared.close();

        if self.torn_down || !self.clear_on_drop {
            return;
        }
        self.purged.store(true, Ordering::SeqCst);

        // No runtime work from here on; plain blocking removes
        for target in self.targets.iter() {
            for path in [partial_path(target), target.clone()] {
                match std::fs::remove_file(&path) {
                    Ok(()) => debug!("Removed {} on teardown", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!("Failed to remove {} on teardown: {}", path.display(), e),
                }
            }
        }
    }
}
