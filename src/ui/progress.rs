//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::cache::{CacheSnapshot, EntryStatus};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner for a single step, or one plain stderr line per state in CI
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
}

impl TaskSpinner {
    pub fn start(ctx: &UiContext, message: &str) -> Self {
        if !ctx.use_fancy_output() {
            eprintln!("{} {}", style("...").dim(), message);
            return Self { spinner: None };
        }

        let spinner = cliclack::spinner();
        spinner.start(message);
        Self {
            spinner: Some(spinner),
        }
    }

    pub fn succeed(self, message: &str) {
        match self.spinner {
            Some(spinner) => spinner.stop(message),
            None => eprintln!("{} {}", style("[OK]").green(), message),
        }
    }

    pub fn fail(self, message: &str) {
        match self.spinner {
            Some(spinner) => spinner.error(message),
            None => eprintln!("{} {}", style("[FAIL]").red(), message),
        }
    }
}

/// Bar tracking how many entries of a snapshot have settled
pub struct PopulateProgress {
    bar: Option<ProgressBar>,
}

impl PopulateProgress {
    /// Shows an indicatif bar in interactive mode, a single line in CI
    pub fn new(ctx: &UiContext, label: &str, total: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total as u64);
            // Template is a constant; fall back to the default style if it is ever rejected
            let style = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(style);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            eprintln!("{} {} {} sources", style("...").dim(), label, total);
            None
        };
        Self { bar }
    }

    /// Reflect a new snapshot
    pub fn update(&self, snapshot: &CacheSnapshot) {
        if let Some(ref bar) = self.bar {
            let settled = snapshot.len() - snapshot.count(EntryStatus::Pending);
            bar.set_position(settled as u64);
            bar.set_message(summary(snapshot));
        }
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// One-line tally, e.g. "2 fetched, 1 cached, 0 failed"
pub fn summary(snapshot: &CacheSnapshot) -> String {
    format!(
        "{} fetched, {} cached, {} failed",
        snapshot.count(EntryStatus::Fetched),
        snapshot.count(EntryStatus::Cached),
        snapshot.count(EntryStatus::Failed)
    )
}
