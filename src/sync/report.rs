//! Run report: one entry per source file, in processing order.

use crate::index::RefreshSummary;
use crate::sync::plan::{PlanEntry, SyncAction};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Ok,
    Skipped,
    Failed,
    Conflict,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "OK",
            Outcome::Skipped => "SKIPPED",
            Outcome::Failed => "FAILED",
            Outcome::Conflict => "CONFLICT",
        }
    }

    pub fn is_problem(&self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Conflict)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub source_path: String,
    /// `None` when the file failed before an action could be planned
    pub action: Option<SyncAction>,
    pub target_path: String,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl ReportEntry {
    pub fn from_plan(entry: &PlanEntry, outcome: Outcome, detail: Option<String>) -> Self {
        Self {
            source_path: entry.source_path.clone(),
            action: Some(entry.action.clone()),
            target_path: entry.target_path().to_string(),
            outcome,
            detail,
        }
    }

    /// A source file that could not be planned (e.g. unreadable)
    pub fn unplanned(source_path: impl Into<String>, detail: impl Into<String>) -> Self {
        let source_path = source_path.into();
        Self {
            target_path: source_path.clone(),
            source_path,
            action: None,
            outcome: Outcome::Failed,
            detail: Some(detail.into()),
        }
    }
}

/// Per-outcome and per-action tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub moved: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub conflicts: usize,
}

impl ReportCounts {
    pub fn total(&self) -> usize {
        self.moved + self.copied + self.skipped + self.failed + self.conflicts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub refresh: RefreshSummary,
    /// Persisted index was corrupt and rebuilt from a full scan
    pub index_rebuilt: bool,
    /// Run stopped early at an interrupt request
    pub interrupted: bool,
    pub entries: Vec<ReportEntry>,
    /// Planned actions, in order, for every file that could be planned
    #[serde(skip)]
    pub plan: Vec<PlanEntry>,
}

impl SyncReport {
    pub fn counts(&self) -> ReportCounts {
        let mut counts = ReportCounts::default();
        for entry in &self.entries {
            match (entry.outcome, &entry.action) {
                (Outcome::Failed, _) => counts.failed += 1,
                (Outcome::Conflict, _) => counts.conflicts += 1,
                (Outcome::Skipped, _) | (Outcome::Ok, Some(SyncAction::Skip)) => {
                    counts.skipped += 1
                }
                (Outcome::Ok, Some(SyncAction::Move { .. })) => counts.moved += 1,
                (Outcome::Ok, Some(SyncAction::Copy)) | (Outcome::Ok, None) => counts.copied += 1,
            }
        }
        counts
    }

    /// Any FAILED or CONFLICT entry
    pub fn has_problems(&self) -> bool {
        self.entries.iter().any(|entry| entry.outcome.is_problem())
    }

    pub fn problems(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|entry| entry.outcome.is_problem())
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
