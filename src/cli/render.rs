//! Snapshot and export rendering for stdout

use crate::cache::{CacheSnapshot, EntryStatus, ExportOutcome};
use crate::cli::args::OutputFormat;
use crate::error::StashResult;
use crate::ui::{self, UiContext};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::path::Path;

/// Print a snapshot in the requested format
pub fn snapshot(snapshot: &CacheSnapshot, format: OutputFormat) -> StashResult<()> {
    match format {
        OutputFormat::Table => print_table(snapshot),
        OutputFormat::Json => println!("{}", snapshot_json(snapshot)?),
        OutputFormat::Plain => {
            for line in plain_lines(snapshot) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn print_table(snapshot: &CacheSnapshot) {
    if snapshot.is_empty() {
        println!("No sources configured.");
        return;
    }

    println!("{:<5} {:<9} {}", "INDEX", "STATUS", "PATH");
    println!("{}", "-".repeat(60));

    for (index, entry) in snapshot.iter().enumerate() {
        let status = ui::status_label(entry.status(), 9);
        let detail = match (entry.local_path(), entry.error()) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(error)) => style(error).red().to_string(),
            (None, None) => style(entry.key().as_str()).dim().to_string(),
        };
        println!("{:<5} {} {}", index, status, detail);
    }

    println!();
    println!("Total: {} ({})", snapshot.len(), ui::summary(snapshot));
}

#[derive(Serialize)]
struct EntryJson<'a> {
    index: usize,
    source: &'a str,
    status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    updated_at: DateTime<Utc>,
}

fn snapshot_json(snapshot: &CacheSnapshot) -> StashResult<String> {
    let entries: Vec<EntryJson> = snapshot
        .iter()
        .enumerate()
        .map(|(index, entry)| EntryJson {
            index,
            source: entry.key().as_str(),
            status: entry.status(),
            path: entry.local_path(),
            error: entry.error(),
            updated_at: entry.updated_at(),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&entries)?)
}

fn plain_lines(snapshot: &CacheSnapshot) -> Vec<String> {
    snapshot
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let detail = match (entry.local_path(), entry.error()) {
                (Some(path), _) => path.display().to_string(),
                (None, Some(error)) => error.to_string(),
                (None, None) => "-".to_string(),
            };
            format!("{}\t{}\t{}", index, entry.status(), detail)
        })
        .collect()
}

/// Print exported paths on stdout, failures on stderr
pub fn export_outcomes(ctx: &UiContext, outcomes: &[ExportOutcome]) {
    for outcome in outcomes {
        match &outcome.result {
            Ok(path) => println!("{}", path.display()),
            Err(e) => ui::step_error_detail(
                ctx,
                &format!("Entry {} ({})", outcome.index, outcome.key),
                &e.to_string(),
            ),
        }
    }
}
