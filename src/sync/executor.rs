//! Executor: applies plan entries to the target tree and the target index.
//!
//! Every completed mutation is recorded on the index before the next entry is
//! processed. In dry-run mode the same decisions are made against read-only
//! checks and replayed on a detached index, so the planner sees exactly the
//! state a real run would have produced.

use crate::error::StorageError;
use crate::fs::{FileStat, FileSystem, WriteOptions};
use crate::index::TargetIndex;
use crate::sync::plan::{PlanEntry, SyncAction};
use crate::sync::report::{Outcome, ReportEntry};
use crate::tree::hasher::HashingReader;
use crate::tree::path;
use crate::types::short_hex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, instrument, warn};

/// What to do when the destination holds different content
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OccupiedPolicy {
    /// Leave the occupant alone and report CONFLICT
    #[default]
    Conflict,
    /// Replace the occupant
    Overwrite,
}

impl std::fmt::Display for OccupiedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OccupiedPolicy::Conflict => write!(f, "conflict"),
            OccupiedPolicy::Overwrite => write!(f, "overwrite"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    pub dry_run: bool,
    pub on_occupied: OccupiedPolicy,
    /// Stamp copies with the source file's mtime
    pub preserve_mtime: bool,
    /// Flush the index store after every completed mutation
    pub flush_each_mutation: bool,
    /// Remove directories a move leaves empty
    pub prune_empty_dirs: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            on_occupied: OccupiedPolicy::Conflict,
            preserve_mtime: true,
            flush_each_mutation: true,
            prune_empty_dirs: true,
        }
    }
}

pub struct Executor<'a> {
    fs: &'a dyn FileSystem,
    source_root: PathBuf,
    target_root: PathBuf,
    options: ExecutorOptions,
    /// Dry run only: target paths a simulated move has emptied
    vacated: HashSet<String>,
}

impl<'a> Executor<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        source_root: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            fs,
            source_root: source_root.into(),
            target_root: target_root.into(),
            options,
            vacated: HashSet::new(),
        }
    }

    /// Apply one plan entry
    ///
    /// Per-file problems become FAILED or CONFLICT report entries. Only an
    /// index store failure is returned as an error: after it the persisted
    /// index can no longer be trusted to match completed mutations.
    #[instrument(skip(self, entry, index), fields(path = %entry.source_path, action = entry.action.label()))]
    pub fn execute(
        &mut self,
        entry: &PlanEntry,
        index: &mut TargetIndex,
    ) -> Result<ReportEntry, StorageError> {
        if let SyncAction::Skip = entry.action {
            return Ok(ReportEntry::from_plan(entry, Outcome::Skipped, None));
        }

        let destination = path::resolve(&self.target_root, entry.target_path());
        if let Some(conflict) = self.check_destination(entry, &destination) {
            return Ok(conflict);
        }
        let overwrite = entry.occupant.is_some();

        match &entry.action {
            SyncAction::Skip => Ok(ReportEntry::from_plan(entry, Outcome::Skipped, None)),
            SyncAction::Move { from } => self.apply_move(entry, from, &destination, overwrite, index),
            SyncAction::Copy => self.apply_copy(entry, &destination, overwrite, index),
        }
    }

    /// CONFLICT when the destination is occupied and may not be replaced
    fn check_destination(&self, entry: &PlanEntry, destination: &Path) -> Option<ReportEntry> {
        if let Some(occupant) = entry.occupant {
            if self.options.on_occupied == OccupiedPolicy::Conflict {
                return Some(ReportEntry::from_plan(
                    entry,
                    Outcome::Conflict,
                    Some(format!(
                        "destination holds different content ({})",
                        short_hex(&occupant)
                    )),
                ));
            }
            return None;
        }
        if self.options.dry_run && self.vacated.contains(entry.target_path()) {
            return None;
        }
        // Something the index does not know about (a directory, an unreadable file)
        match self.fs.exists(destination) {
            Ok(false) => None,
            Ok(true) => Some(ReportEntry::from_plan(
                entry,
                Outcome::Conflict,
                Some("destination exists but is not an indexed file".to_string()),
            )),
            Err(e) => Some(failed(entry, "cannot inspect destination", &e)),
        }
    }

    fn apply_move(
        &mut self,
        entry: &PlanEntry,
        from: &str,
        destination: &Path,
        overwrite: bool,
        index: &mut TargetIndex,
    ) -> Result<ReportEntry, StorageError> {
        let origin = path::resolve(&self.target_root, from);
        let origin_stat = match self.fs.stat(&origin) {
            Ok(Some(stat)) => stat,
            Ok(None) => {
                warn!(from, "Move source vanished from target, dropping stale index entry");
                index.remove(from)?;
                self.flush_after_mutation(index)?;
                return Ok(ReportEntry::from_plan(
                    entry,
                    Outcome::Failed,
                    Some(format!("move source {} no longer exists", from)),
                ));
            }
            Err(e) => return Ok(failed(entry, "cannot inspect move source", &e)),
        };

        if self.options.dry_run {
            index.record_move(from, entry.target_path(), entry.fingerprint, origin_stat)?;
            self.vacated.remove(entry.target_path());
            self.vacated.insert(from.to_string());
            return Ok(ReportEntry::from_plan(entry, Outcome::Ok, None));
        }

        if let Err(e) = self.ensure_parent(destination) {
            return Ok(failed(entry, "cannot create destination directory", &e));
        }
        if let Err(e) = self.fs.rename(&origin, destination, overwrite) {
            return Ok(mutation_error(entry, "move failed", &e));
        }

        let stat = self.written_stat(destination).unwrap_or(origin_stat);
        index.record_move(from, entry.target_path(), entry.fingerprint, stat)?;
        self.flush_after_mutation(index)?;
        info!(from, to = entry.target_path(), "Moved");

        if self.options.prune_empty_dirs {
            self.prune_empty_parents(from);
        }
        Ok(ReportEntry::from_plan(entry, Outcome::Ok, None))
    }

    fn apply_copy(
        &mut self,
        entry: &PlanEntry,
        destination: &Path,
        overwrite: bool,
        index: &mut TargetIndex,
    ) -> Result<ReportEntry, StorageError> {
        let source = path::resolve(&self.source_root, &entry.source_path);
        let source_stat = match self.fs.stat(&source) {
            Ok(Some(stat)) => stat,
            Ok(None) => {
                return Ok(ReportEntry::from_plan(
                    entry,
                    Outcome::Failed,
                    Some("source file no longer exists".to_string()),
                ))
            }
            Err(e) => return Ok(failed(entry, "cannot inspect source", &e)),
        };

        if self.options.dry_run {
            index.record_copy(entry.target_path(), entry.fingerprint, source_stat)?;
            self.vacated.remove(entry.target_path());
            return Ok(ReportEntry::from_plan(entry, Outcome::Ok, None));
        }

        if let Err(e) = self.ensure_parent(destination) {
            return Ok(failed(entry, "cannot create destination directory", &e));
        }
        let reader = match self.fs.open_read(&source) {
            Ok(reader) => reader,
            Err(e) => return Ok(failed(entry, "cannot read source", &e)),
        };
        let mut hashing = HashingReader::new(reader);
        let write_options = WriteOptions {
            overwrite,
            modified: self.options.preserve_mtime.then_some(source_stat.modified),
        };
        let written = match self.fs.write_atomic(destination, &mut hashing, &write_options) {
            Ok(written) => written,
            Err(e) => return Ok(mutation_error(entry, "copy failed", &e)),
        };

        let actual = hashing.finalize();
        let detail = (actual != entry.fingerprint).then(|| {
            warn!(
                planned = %short_hex(&entry.fingerprint),
                written = %short_hex(&actual),
                "Source changed during copy"
            );
            "source changed during copy; indexed the content actually written".to_string()
        });

        let stat = self.written_stat(destination).unwrap_or(FileStat {
            size: written,
            modified: SystemTime::now(),
        });
        index.record_copy(entry.target_path(), actual, stat)?;
        self.flush_after_mutation(index)?;
        info!(to = entry.target_path(), bytes = written, "Copied");
        Ok(ReportEntry::from_plan(entry, Outcome::Ok, detail))
    }

    /// Stat of a just-written destination; the next refresh corrects a fallback
    fn written_stat(&self, destination: &Path) -> Option<FileStat> {
        match self.fs.stat(destination) {
            Ok(Some(stat)) => Some(stat),
            Ok(None) => {
                warn!(path = %destination.display(), "Destination missing right after write");
                None
            }
            Err(e) => {
                warn!(path = %destination.display(), error = %e, "Cannot stat destination after write");
                None
            }
        }
    }

    fn ensure_parent(&self, destination: &Path) -> io::Result<()> {
        match destination.parent() {
            Some(parent) if parent != self.target_root => self.fs.create_dir_all(parent),
            _ => Ok(()),
        }
    }

    fn flush_after_mutation(&self, index: &TargetIndex) -> Result<(), StorageError> {
        if self.options.flush_each_mutation && !self.options.dry_run {
            index.flush()?;
        }
        Ok(())
    }

    /// Remove directories emptied by moving `from` away, stopping at the target root
    fn prune_empty_parents(&self, from: &str) {
        let mut current = path::parent_key(from);
        while let Some(dir) = current {
            let absolute = path::resolve(&self.target_root, dir);
            match self.fs.remove_dir_if_empty(&absolute) {
                Ok(true) => debug!(dir, "Removed empty directory"),
                Ok(false) => break,
                Err(e) => {
                    debug!(dir, error = %e, "Stopped pruning empty directories");
                    break;
                }
            }
            current = path::parent_key(dir);
        }
    }
}

fn failed(entry: &PlanEntry, context: &str, err: &io::Error) -> ReportEntry {
    warn!(path = %entry.source_path, error = %err, "{}", context);
    ReportEntry::from_plan(entry, Outcome::Failed, Some(format!("{}: {}", context, err)))
}

/// An `AlreadyExists` from a no-clobber mutation means something appeared at
/// the destination after planning.
fn mutation_error(entry: &PlanEntry, context: &str, err: &io::Error) -> ReportEntry {
    if err.kind() == io::ErrorKind::AlreadyExists {
        warn!(path = %entry.source_path, "Destination appeared after planning");
        return ReportEntry::from_plan(
            entry,
            Outcome::Conflict,
            Some("destination appeared after planning".to_string()),
        );
    }
    failed(entry, context, err)
}
