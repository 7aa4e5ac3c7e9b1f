//! CLI command implementations

pub mod clear;
pub mod config;
pub mod export;
pub mod populate;

pub use clear::execute as clear;
pub use config::execute as config;
pub use export::execute as export;
pub use populate::execute as populate;

use crate::cache::{CacheCoordinator, CacheSnapshot};
use crate::config::Config;
use crate::error::{StashError, StashResult};
use crate::ui::{PopulateProgress, UiContext};
use std::future::Future;
use tracing::{debug, warn};

/// Drive `work` while a progress bar follows the coordinator's snapshots
///
/// Returns `None` if interrupted with Ctrl-C.
pub(crate) async fn with_progress<F>(
    coordinator: &CacheCoordinator,
    ctx: &UiContext,
    label: &str,
    work: F,
) -> Option<StashResult<CacheSnapshot>>
where
    F: Future<Output = StashResult<CacheSnapshot>>,
{
    let mut updates = coordinator.subscribe();
    let progress = PopulateProgress::new(ctx, label, coordinator.keys().len());

    tokio::pin!(work);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let outcome = loop {
        tokio::select! {
            result = &mut work => break Some(result),
            Ok(()) = updates.changed() => progress.update(&updates.borrow_and_update()),
            _ = &mut interrupt => {
                warn!("Interrupted, abandoning in-flight fetches");
                break None;
            }
        }
    };

    progress.finish();
    outcome
}

/// Release a coordinator at the end of a command
///
/// Deletes the cached files when `cache.clear_on_exit` is set.
pub(crate) async fn release(coordinator: CacheCoordinator, config: &Config) {
    if !config.cache.clear_on_exit {
        return;
    }

    let report = coordinator.shutdown().await;
    debug!(
        "Teardown removed {} file(s), {} failure(s)",
        report.removed,
        report.failures.len()
    );
}

pub(crate) fn interrupted() -> StashError {
    StashError::User("Interrupted".to_string())
}
