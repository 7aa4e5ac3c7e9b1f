//! Clear command - delete cached images, optionally fetching them again

use super::{interrupted, release, with_progress};
use crate::cache::CacheCoordinator;
use crate::cli::args::ClearArgs;
use crate::cli::render;
use crate::config::Config;
use crate::error::{StashError, StashResult};
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> StashResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let coordinator = CacheCoordinator::from_config(config)?;
    let count = coordinator.keys().len();

    let prompt = if args.no_refetch {
        format!("Delete {} cached image(s)?", count)
    } else {
        format!("Delete and download {} image(s) again?", count)
    };
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Aborted", "Use --yes to skip confirmation");
        return Ok(());
    }

    if args.no_refetch {
        return delete_only(coordinator, config, &ctx).await;
    }

    let outcome = with_progress(
        &coordinator,
        &ctx,
        "Refreshing",
        coordinator.clear_and_repopulate(),
    )
    .await;
    let snapshot = coordinator.current_snapshot();
    release(coordinator, config).await;

    let result = outcome.ok_or_else(interrupted)?;
    render::snapshot(&snapshot, args.format)?;
    result?;

    ui::outro_success(&ctx, &format!("Cache rebuilt: {}", ui::summary(&snapshot)));
    Ok(())
}

async fn delete_only(
    coordinator: CacheCoordinator,
    config: &Config,
    ctx: &UiContext,
) -> StashResult<()> {
    let count = coordinator.keys().len();
    let spinner = TaskSpinner::start(ctx, "Deleting cached images...");

    let report = coordinator.clear().await;
    release(coordinator, config).await;

    if report.failures.is_empty() {
        spinner.succeed(&format!("Removed {} file(s)", report.removed));
        return Ok(());
    }

    spinner.fail(&format!(
        "Removed {} file(s), {} failed",
        report.removed,
        report.failures.len()
    ));
    for (index, error) in &report.failures {
        ui::step_error_detail(ctx, &format!("Entry {}", index), &error.to_string());
    }

    if report.failures.len() == count {
        return Err(StashError::AllFailed {
            operation: "delete",
            count,
        });
    }
    Ok(())
}
