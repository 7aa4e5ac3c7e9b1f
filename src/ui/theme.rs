//! Colours for cache entry states

use crate::cache::EntryStatus;
use console::Style;

/// Style used wherever an entry status is printed
pub fn status_style(status: EntryStatus) -> Style {
    match status {
        EntryStatus::Fetched => Style::new().green(),
        EntryStatus::Cached => Style::new().cyan(),
        EntryStatus::Failed => Style::new().red(),
        EntryStatus::Pending => Style::new().dim(),
    }
}

/// Status label padded to a fixed column width, then styled
pub fn status_label(status: EntryStatus, width: usize) -> String {
    status_style(status)
        .apply_to(format!("{:<width$}", status, width = width))
        .to_string()
}
