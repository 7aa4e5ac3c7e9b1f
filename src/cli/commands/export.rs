//! Export command - copy cached images out of the cache

use super::{interrupted, release, with_progress};
use crate::cache::CacheCoordinator;
use crate::cli::args::ExportArgs;
use crate::cli::render;
use crate::config::Config;
use crate::error::StashResult;
use crate::ui::{self, UiContext};
use tracing::debug;

/// Execute the export command
pub async fn execute(args: ExportArgs, config: &Config) -> StashResult<()> {
    let ctx = UiContext::detect();

    let mut config = config.clone();
    if let Some(dest) = args.dest {
        config.export.dir = Some(dest);
    }
    let coordinator = CacheCoordinator::from_config(&config)?;

    // An out-of-range index is reported by export_one without fetching anything
    let in_range = args.index.map_or(true, |i| i < coordinator.keys().len());
    if in_range {
        match with_progress(&coordinator, &ctx, "Caching", coordinator.populate_all()).await {
            None => {
                release(coordinator, &config).await;
                return Err(interrupted());
            }
            Some(Err(e)) => debug!("Populate before export failed: {}", e),
            Some(Ok(_)) => {}
        }
    }

    let result = match args.index {
        Some(index) => coordinator.export_one(index).await.map(|path| {
            println!("{}", path.display());
            ui::step_ok(&ctx, &format!("Exported entry {}", index));
        }),
        None => coordinator.export_all().await.map(|outcomes| {
            render::export_outcomes(&ctx, &outcomes);
            let exported = outcomes.iter().filter(|o| o.result.is_ok()).count();
            ui::outro_success(
                &ctx,
                &format!(
                    "Exported {} of {} to {}",
                    exported,
                    outcomes.len(),
                    coordinator.export_dir().display()
                ),
            );
        }),
    };

    release(coordinator, &config).await;
    result
}
