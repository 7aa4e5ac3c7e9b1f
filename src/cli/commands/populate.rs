//! Populate command - cache every source and report its status

use super::{interrupted, release, with_progress};
use crate::cache::{CacheCoordinator, EntryStatus};
use crate::cli::args::PopulateArgs;
use crate::cli::render;
use crate::config::Config;
use crate::error::StashResult;
use crate::ui::{self, UiContext};

/// Execute the populate command
pub async fn execute(args: PopulateArgs, config: &Config) -> StashResult<()> {
    let ctx = UiContext::detect();
    let coordinator = CacheCoordinator::from_config(config)?;

    let outcome = with_progress(&coordinator, &ctx, "Caching", coordinator.populate_all()).await;
    let snapshot = coordinator.current_snapshot();
    release(coordinator, config).await;

    let result = outcome.ok_or_else(interrupted)?;
    render::snapshot(&snapshot, args.format)?;
    result?;

    let failed = snapshot.count(EntryStatus::Failed);
    if failed > 0 {
        ui::outro_warn(
            &ctx,
            &format!("{} of {} sources failed", failed, snapshot.len()),
        );
    } else {
        ui::outro_success(&ctx, &ui::summary(&snapshot));
    }

    Ok(())
}
