//! Reconciliation planner: decides MOVE, COPY or SKIP for each source file.
//! Reads the target index only; every mutation belongs to the executor.

use crate::error::SyncError;
use crate::fs::FileSystem;
use crate::index::TargetIndex;
use crate::tree::hasher::fingerprint_file;
use crate::tree::path;
use crate::tree::walker::FileRecord;
use crate::types::{serialize_hex, serialize_hex_opt, Fingerprint};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncAction {
    /// Destination already holds the content
    Skip,
    /// Transfer bytes from the source tree
    Copy,
    /// Relocate an existing target file holding the same content
    Move { from: String },
}

impl SyncAction {
    pub fn label(&self) -> &'static str {
        match self {
            SyncAction::Skip => "skip",
            SyncAction::Copy => "copy",
            SyncAction::Move { .. } => "move",
        }
    }
}

/// One planned action. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    /// Source-relative path; also the destination path relative to the target root
    pub source_path: String,
    #[serde(serialize_with = "serialize_hex")]
    pub fingerprint: Fingerprint,
    pub action: SyncAction,
    /// Fingerprint of different content already sitting at the destination
    #[serde(serialize_with = "serialize_hex_opt")]
    pub occupant: Option<Fingerprint>,
}

impl PlanEntry {
    pub fn target_path(&self) -> &str {
        &self.source_path
    }
}

/// Planner for one run
///
/// Knows the full set of source paths up front so it can refuse to take a
/// move candidate from a path that is itself the correct home of that content.
pub struct Planner<'a> {
    fs: &'a dyn FileSystem,
    source_root: PathBuf,
    source_paths: HashSet<String>,
    fingerprints: HashMap<String, Fingerprint>,
}

impl<'a> Planner<'a> {
    pub fn new<I>(fs: &'a dyn FileSystem, source_root: impl Into<PathBuf>, source_paths: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            fs,
            source_root: source_root.into(),
            source_paths: source_paths.into_iter().collect(),
            fingerprints: HashMap::new(),
        }
    }

    /// Plan the action for one source file against the current index
    pub fn plan(
        &mut self,
        record: &FileRecord,
        index: &TargetIndex,
    ) -> Result<PlanEntry, SyncError> {
        let fingerprint = self.source_fingerprint(&record.rel_path).map_err(|e| {
            SyncError::io(path::resolve(&self.source_root, &record.rel_path), e)
        })?;
        let destination = record.rel_path.as_str();
        let occupant = index.get(destination).map(|entry| entry.fingerprint);

        if occupant == Some(fingerprint) {
            return Ok(PlanEntry {
                source_path: record.rel_path.clone(),
                fingerprint,
                action: SyncAction::Skip,
                occupant: None,
            });
        }

        let candidate = index
            .lookup_where(&fingerprint, |candidate| {
                candidate != destination && self.is_move_candidate(candidate, &fingerprint)
            })
            .map(str::to_string);

        let action = match candidate {
            Some(from) => SyncAction::Move { from },
            None => SyncAction::Copy,
        };
        debug!(
            path = destination,
            action = action.label(),
            occupied = occupant.is_some(),
            "Planned"
        );
        Ok(PlanEntry {
            source_path: record.rel_path.clone(),
            fingerprint,
            action,
            occupant,
        })
    }

    /// A target path already holding the content its source counterpart has
    /// is that content's home and never a move candidate.
    fn is_move_candidate(&mut self, candidate: &str, fingerprint: &Fingerprint) -> bool {
        if !self.source_paths.contains(candidate) {
            return true;
        }
        match self.source_fingerprint(candidate) {
            Ok(home) => home != *fingerprint,
            // Cannot prove the path is free to take
            Err(_) => false,
        }
    }

    fn source_fingerprint(&mut self, rel_path: &str) -> std::io::Result<Fingerprint> {
        if let Some(fingerprint) = self.fingerprints.get(rel_path) {
            return Ok(*fingerprint);
        }
        let fingerprint = fingerprint_file(self.fs, &path::resolve(&self.source_root, rel_path))?;
        self.fingerprints.insert(rel_path.to_string(), fingerprint);
        Ok(fingerprint)
    }
}
