//! Target index
//!
//! Authoritative in-run view of which content lives where on the target:
//! fingerprint → set of target-relative paths, with at most one entry per
//! path. Mutations are mirrored to an attached [`IndexStore`] as they happen so
//! an interrupted run leaves the persisted index consistent with whatever
//! mutations actually completed.

use crate::error::{ScanError, StorageError};
use crate::fs::{FileStat, FileSystem};
use crate::store::{IndexEntry, IndexStore};
use crate::tree::hasher::fingerprint_file;
use crate::tree::path;
use crate::tree::walker::FileRecord;
use crate::types::{short_hex, Fingerprint};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// What a refresh changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    /// Regular files seen on the target
    pub scanned: usize,
    /// Files whose content had to be fingerprinted
    pub hashed: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    /// Files that could not be read and were left out of the index
    pub unreadable: usize,
    /// Walk errors (unreadable directories, non-UTF-8 names)
    pub scan_errors: usize,
}

/// Fingerprint → paths map over the target tree
#[derive(Default)]
pub struct TargetIndex {
    by_path: BTreeMap<String, IndexEntry>,
    by_fingerprint: HashMap<Fingerprint, BTreeSet<String>>,
    store: Option<Box<dyn IndexStore>>,
}

impl std::fmt::Debug for TargetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetIndex")
            .field("entries", &self.by_path.len())
            .field("fingerprints", &self.by_fingerprint.len())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl TargetIndex {
    /// Empty index with no backing store
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty index writing through to `store`
    pub fn attached(store: Box<dyn IndexStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Load every entry from `store` and keep writing through to it
    pub fn load(store: Box<dyn IndexStore>) -> Result<Self, StorageError> {
        let entries = store.load()?;
        let mut index = Self::attached(store);
        for entry in entries {
            index.insert_in_memory(entry);
        }
        Ok(index)
    }

    /// Load from `store`, discarding it if it is corrupt
    ///
    /// Returns the index and whether the persisted data was thrown away. A
    /// discarded index is rebuilt by the next [`TargetIndex::refresh`].
    pub fn load_or_rebuild(store: Box<dyn IndexStore>) -> Result<(Self, bool), StorageError> {
        match store.load() {
            Ok(entries) => {
                let mut index = Self::attached(store);
                for entry in entries {
                    index.insert_in_memory(entry);
                }
                Ok((index, false))
            }
            Err(StorageError::IndexCorrupt(reason)) => {
                warn!(reason = %reason, "Persisted index is corrupt, rebuilding from a full scan");
                store.clear()?;
                store.flush()?;
                Ok((Self::attached(store), true))
            }
            Err(e) => Err(e),
        }
    }

    /// Copy of the in-memory state with no backing store
    ///
    /// Mutations on the copy never reach the persisted index.
    pub fn detached(&self) -> Self {
        Self {
            by_path: self.by_path.clone(),
            by_fingerprint: self.by_fingerprint.clone(),
            store: None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.by_path.get(path)
    }

    /// Entries in path order
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.by_path.values()
    }

    /// Every known path holding `fingerprint`, smallest first
    pub fn paths_for(&self, fingerprint: &Fingerprint) -> impl Iterator<Item = &str> {
        self.by_fingerprint
            .get(fingerprint)
            .into_iter()
            .flat_map(|paths| paths.iter().map(String::as_str))
    }

    /// One known path holding `fingerprint`: the lexicographically smallest
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&str> {
        self.paths_for(fingerprint).next()
    }

    /// Smallest path holding `fingerprint` that satisfies `accept`
    pub fn lookup_where<F>(&self, fingerprint: &Fingerprint, mut accept: F) -> Option<&str>
    where
        F: FnMut(&str) -> bool,
    {
        self.paths_for(fingerprint).find(|path| accept(path))
    }

    /// Insert or replace the entry for `entry.path`
    pub fn insert(&mut self, entry: IndexEntry) -> Result<Option<IndexEntry>, StorageError> {
        if let Some(store) = &self.store {
            store.put(&entry)?;
        }
        Ok(self.insert_in_memory(entry))
    }

    /// Drop the entry for `path`
    pub fn remove(&mut self, path: &str) -> Result<Option<IndexEntry>, StorageError> {
        let removed = self.remove_in_memory(path);
        if removed.is_some() {
            if let Some(store) = &self.store {
                store.remove(path)?;
            }
        }
        Ok(removed)
    }

    /// Reflect a completed move of `fingerprint` content from `old_path` to `new_path`
    pub fn record_move(
        &mut self,
        old_path: &str,
        new_path: &str,
        fingerprint: Fingerprint,
        stat: FileStat,
    ) -> Result<(), StorageError> {
        self.remove(old_path)?;
        self.insert(IndexEntry::new(new_path, fingerprint, stat))?;
        debug!(from = old_path, to = new_path, fingerprint = %short_hex(&fingerprint), "Recorded move");
        Ok(())
    }

    /// Reflect a completed copy of `fingerprint` content to `new_path`
    pub fn record_copy(
        &mut self,
        new_path: &str,
        fingerprint: Fingerprint,
        stat: FileStat,
    ) -> Result<(), StorageError> {
        self.insert(IndexEntry::new(new_path, fingerprint, stat))?;
        debug!(path = new_path, fingerprint = %short_hex(&fingerprint), "Recorded copy");
        Ok(())
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        match &self.store {
            Some(store) => store.flush(),
            None => Ok(()),
        }
    }

    /// Reconcile the index against a fresh walk of the target tree
    ///
    /// Entries whose path vanished are removed. New files, and files whose
    /// size or mtime changed, are fingerprinted and inserted; unchanged files
    /// keep their recorded fingerprint without being read. Hashing runs on the
    /// rayon pool when `parallel` is set; results are applied in scan order.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn refresh<I>(
        &mut self,
        records: I,
        fs: &dyn FileSystem,
        root: &Path,
        parallel: bool,
    ) -> Result<RefreshSummary, StorageError>
    where
        I: IntoIterator<Item = Result<FileRecord, ScanError>>,
    {
        let start = Instant::now();
        let mut summary = RefreshSummary::default();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for record in records {
            match record {
                Ok(record) => {
                    summary.scanned += 1;
                    seen.insert(record.rel_path.clone());
                    let fresh = self
                        .by_path
                        .get(&record.rel_path)
                        .map(|entry| entry.matches_stat(record.size, record.modified))
                        .unwrap_or(false);
                    if !fresh {
                        pending.push(record);
                    }
                }
                Err(e) => {
                    summary.scan_errors += 1;
                    warn!(error = %e, "Skipping target entry during refresh");
                }
            }
        }

        let stale: Vec<String> = self
            .by_path
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();
        for path in stale {
            self.remove(&path)?;
            summary.removed += 1;
        }

        let hash_one = |record: &FileRecord| -> io::Result<Fingerprint> {
            fingerprint_file(fs, &path::resolve(root, &record.rel_path))
        };
        let results: Vec<io::Result<Fingerprint>> = if parallel {
            pending.par_iter().map(hash_one).collect()
        } else {
            pending.iter().map(hash_one).collect()
        };

        for (record, result) in pending.into_iter().zip(results) {
            match result {
                Ok(fingerprint) => {
                    summary.hashed += 1;
                    let entry = IndexEntry {
                        fingerprint,
                        path: record.rel_path,
                        size: record.size,
                        modified: record.modified,
                    };
                    if self.insert(entry)?.is_some() {
                        summary.updated += 1;
                    } else {
                        summary.added += 1;
                    }
                }
                Err(e) => {
                    summary.unreadable += 1;
                    warn!(path = %record.rel_path, error = %e, "Target file unreadable, leaving it out of the index");
                    if self.remove(&record.rel_path)?.is_some() {
                        summary.removed += 1;
                    }
                }
            }
        }

        self.flush()?;
        info!(
            scanned = summary.scanned,
            hashed = summary.hashed,
            added = summary.added,
            updated = summary.updated,
            removed = summary.removed,
            unreadable = summary.unreadable,
            duration_ms = start.elapsed().as_millis(),
            "Target index refreshed"
        );
        Ok(summary)
    }

    fn insert_in_memory(&mut self, entry: IndexEntry) -> Option<IndexEntry> {
        let previous = self.remove_in_memory(&entry.path);
        self.by_fingerprint
            .entry(entry.fingerprint)
            .or_default()
            .insert(entry.path.clone());
        self.by_path.insert(entry.path.clone(), entry);
        previous
    }

    fn remove_in_memory(&mut self, path: &str) -> Option<IndexEntry> {
        let previous = self.by_path.remove(path)?;
        if let Some(paths) = self.by_fingerprint.get_mut(&previous.fingerprint) {
            paths.remove(path);
            if paths.is_empty() {
                self.by_fingerprint.remove(&previous.fingerprint);
            }
        }
        Some(previous)
    }
}
