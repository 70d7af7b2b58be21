//! CLI presentation: text and json formatters for sync reports.

use crate::error::SyncError;
use crate::sync::plan::SyncAction;
use crate::sync::report::{Outcome, ReportCounts, ReportEntry, SyncReport};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

fn paint(text: &str, outcome: Outcome, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match outcome {
        Outcome::Ok => text.green().to_string(),
        Outcome::Skipped => text.dimmed().to_string(),
        Outcome::Failed => text.red().bold().to_string(),
        Outcome::Conflict => text.yellow().bold().to_string(),
    }
}

/// One report line per source file, e.g. `move  old/b.txt -> a.txt`
pub fn format_entry_line(entry: &ReportEntry, dry_run: bool, color: bool) -> String {
    let verb = match (&entry.action, dry_run) {
        (None, _) => "read",
        (Some(SyncAction::Skip), _) => "skip",
        (Some(SyncAction::Copy), false) => "copy",
        (Some(SyncAction::Copy), true) => "would copy",
        (Some(SyncAction::Move { .. }), false) => "move",
        (Some(SyncAction::Move { .. }), true) => "would move",
    };
    let subject = match &entry.action {
        Some(SyncAction::Move { from }) => format!("{} -> {}", from, entry.target_path),
        _ => entry.target_path.clone(),
    };

    let mut line = match entry.outcome {
        Outcome::Ok | Outcome::Skipped => {
            format!("{:<10} {}", paint(verb, entry.outcome, color), subject)
        }
        Outcome::Failed | Outcome::Conflict => format!(
            "{:<10} {} ({})",
            paint(entry.outcome.as_str(), entry.outcome, color),
            subject,
            verb
        ),
    };
    if let Some(detail) = &entry.detail {
        line.push_str(": ");
        line.push_str(detail);
    }
    line
}

fn heading(title: &str, color: bool) -> String {
    if color {
        format!("{}", title.bold().underline())
    } else {
        title.to_string()
    }
}

/// Closing summary: counts table plus index notes
pub fn format_summary(report: &SyncReport, color: bool) -> String {
    let counts = report.counts();
    let title = if report.dry_run {
        "Dry run summary"
    } else {
        "Sync summary"
    };

    let mut out = String::new();
    out.push_str(&format!("\n{}\n\n", heading(title, color)));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Moved", "Copied", "Skipped", "Failed", "Conflicts"]);
    table.add_row(vec![
        counts.moved.to_string(),
        counts.copied.to_string(),
        counts.skipped.to_string(),
        counts.failed.to_string(),
        counts.conflicts.to_string(),
    ]);
    out.push_str(&format!("{}\n", table));

    let refresh = &report.refresh;
    out.push_str(&format!(
        "  Target index: {} files, {} hashed, {} removed",
        refresh.scanned, refresh.hashed, refresh.removed
    ));
    if refresh.unreadable > 0 {
        out.push_str(&format!(", {} unreadable", refresh.unreadable));
    }
    out.push('\n');
    if report.index_rebuilt {
        out.push_str("  Index was corrupt and has been rebuilt from the target tree\n");
    }
    if report.interrupted {
        out.push_str(&format!(
            "  Interrupted after {} entries; re-run to finish\n",
            report.entries.len()
        ));
    }
    out.push_str(&format!("  Duration: {} ms\n", report.duration_ms()));
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a SyncReport,
    counts: ReportCounts,
}

pub fn format_report_json(report: &SyncReport) -> Result<String, SyncError> {
    let json = JsonReport {
        report,
        counts: report.counts(),
    };
    serde_json::to_string_pretty(&json)
        .map_err(|e| SyncError::ConfigError(format!("Failed to serialize report: {}", e)))
}
