//! Sync session: one invocation's roots, collaborators and target index.
//!
//! A run refreshes the index against the target tree, scans the source tree,
//! then plans and executes one source file at a time so every lookup sees the
//! mutations made before it.

use crate::config::RelocaseConfig;
use crate::error::{RootRole, StorageError, SyncError};
use crate::fs::{FileSystem, OsFs};
use crate::index::{RefreshSummary, TargetIndex};
use crate::store::{IndexStore, MemoryIndexStore, SledIndexStore};
use crate::sync::executor::{Executor, ExecutorOptions};
use crate::sync::plan::{PlanEntry, Planner};
use crate::sync::report::{ReportEntry, SyncReport};
use crate::tree::walker::{FileRecord, Scanner};
use crate::tree::path;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Location of the sled index for `target_root`
pub fn index_path(target_root: &Path, dir_name: &str) -> PathBuf {
    target_root.join(dir_name).join("index")
}

pub struct SyncSession {
    source_root: PathBuf,
    target_root: PathBuf,
    dry_run: bool,
    config: RelocaseConfig,
    fs: Arc<dyn FileSystem>,
    index: TargetIndex,
    index_rebuilt: bool,
    interrupt: Arc<AtomicBool>,
}

struct Reconciled {
    refresh: RefreshSummary,
    entries: Vec<ReportEntry>,
    plan: Vec<PlanEntry>,
    interrupted: bool,
}

impl SyncSession {
    /// Session over the real filesystem with the index persisted under the target root
    ///
    /// A dry run never opens the persisted store: it reads a snapshot of the
    /// entries, and when no index exists yet it works from an empty in-memory
    /// one instead of creating the store.
    pub fn open(
        source_root: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
        dry_run: bool,
        config: RelocaseConfig,
    ) -> Result<Self, SyncError> {
        let source_root = canonical_root(RootRole::Source, source_root.into())?;
        let target_root = canonical_root(RootRole::Target, target_root.into())?;
        let fs: Arc<dyn FileSystem> = Arc::new(OsFs::new());
        validate_roots(fs.as_ref(), &source_root, &target_root)?;

        let store_path = index_path(&target_root, &config.index.dir_name);
        let mut recreated = false;
        let store: Option<Box<dyn IndexStore>> = if dry_run {
            if SledIndexStore::exists(&store_path) {
                match SledIndexStore::read_snapshot(&store_path) {
                    Ok(entries) => Some(Box::new(MemoryIndexStore::with_entries(&entries)?)),
                    Err(StorageError::IndexCorrupt(reason)) => {
                        warn!(reason = %reason, "Index database corrupt, dry run starts from an empty index");
                        recreated = true;
                        None
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                None
            }
        } else {
            let (store, was_recreated) = SledIndexStore::open_or_recreate(&store_path)?;
            recreated = was_recreated;
            Some(Box::new(store))
        };

        let mut session = Self::with_parts(source_root, target_root, dry_run, config, fs, store)?;
        session.index_rebuilt |= recreated;
        Ok(session)
    }

    /// Session over injected collaborators
    pub fn with_parts(
        source_root: impl Into<PathBuf>,
        target_root: impl Into<PathBuf>,
        dry_run: bool,
        config: RelocaseConfig,
        fs: Arc<dyn FileSystem>,
        store: Option<Box<dyn IndexStore>>,
    ) -> Result<Self, SyncError> {
        let source_root = source_root.into();
        let target_root = target_root.into();
        validate_roots(fs.as_ref(), &source_root, &target_root)?;

        let (index, index_rebuilt) = prepare_index(store, dry_run)?;
        Ok(Self {
            source_root,
            target_root,
            dry_run,
            config,
            fs,
            index,
            index_rebuilt,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Set the returned flag to stop the run before its next entry
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn index(&self) -> &TargetIndex {
        &self.index
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    pub fn run(&mut self) -> Result<SyncReport, SyncError> {
        self.run_with(|_| {})
    }

    /// Run the sync, handing each report entry to `observer` as it is produced
    #[instrument(skip_all, fields(source = %self.source_root.display(), target = %self.target_root.display(), dry_run = self.dry_run))]
    pub fn run_with<F>(&mut self, observer: F) -> Result<SyncReport, SyncError>
    where
        F: FnMut(&ReportEntry),
    {
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Sync started");

        let result = self.reconcile(observer);

        // Persist whatever completed, even when the run stopped early
        if !self.dry_run {
            if let Err(e) = self.index.flush() {
                warn!(error = %e, "Failed to flush target index");
                if result.is_ok() {
                    return Err(e.into());
                }
            }
        }
        let reconciled = result?;

        let report = SyncReport {
            source_root: self.source_root.clone(),
            target_root: self.target_root.clone(),
            dry_run: self.dry_run,
            started_at,
            finished_at: Utc::now(),
            refresh: reconciled.refresh,
            index_rebuilt: self.index_rebuilt,
            interrupted: reconciled.interrupted,
            entries: reconciled.entries,
            plan: reconciled.plan,
        };
        let counts = report.counts();
        info!(
            moved = counts.moved,
            copied = counts.copied,
            skipped = counts.skipped,
            failed = counts.failed,
            conflicts = counts.conflicts,
            interrupted = report.interrupted,
            duration_ms = start.elapsed().as_millis(),
            "Sync finished"
        );
        Ok(report)
    }

    fn reconcile<F>(&mut self, mut observer: F) -> Result<Reconciled, SyncError>
    where
        F: FnMut(&ReportEntry),
    {
        let fs: &dyn FileSystem = self.fs.as_ref();
        let dir_name = self.config.index.dir_name.as_str();

        let target_scanner = Scanner::new(fs, &self.target_root, &self.config.scan)
            .excluding(dir_name)
            .skipping_write_temps();
        let refresh = self.index.refresh(
            target_scanner.scan(),
            fs,
            &self.target_root,
            self.config.sync.parallel_refresh,
        )?;

        let source_scanner =
            Scanner::new(fs, &self.source_root, &self.config.scan).excluding(dir_name);
        let scanned: Vec<_> = source_scanner.scan().collect();
        let source_paths = scanned
            .iter()
            .filter_map(|item| item.as_ref().ok())
            .map(|record: &FileRecord| record.rel_path.clone());
        let mut planner = Planner::new(fs, &self.source_root, source_paths);

        let options = ExecutorOptions {
            dry_run: self.dry_run,
            on_occupied: self.config.sync.on_occupied,
            preserve_mtime: self.config.sync.preserve_mtime,
            flush_each_mutation: self.config.sync.flush_each_mutation,
            prune_empty_dirs: self.config.sync.prune_empty_dirs,
        };
        let mut executor = Executor::new(fs, &self.source_root, &self.target_root, options);

        let mut entries = Vec::with_capacity(scanned.len());
        let mut plan = Vec::new();
        let mut interrupted = false;

        for item in scanned {
            if self.interrupt.load(Ordering::SeqCst) {
                info!(processed = entries.len(), "Interrupt requested, stopping before next entry");
                interrupted = true;
                break;
            }
            let entry = match item {
                Ok(record) => match planner.plan(&record, &self.index) {
                    Ok(planned) => {
                        let entry = executor.execute(&planned, &mut self.index)?;
                        plan.push(planned);
                        entry
                    }
                    Err(e) => {
                        warn!(path = %record.rel_path, error = %e, "Cannot plan source file");
                        ReportEntry::unplanned(record.rel_path, e.to_string())
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable source entry");
                    let source_path = e
                        .path()
                        .and_then(|p| path::relative_key(&self.source_root, p))
                        .unwrap_or_else(|| {
                            e.path()
                                .map(|p| p.display().to_string())
                                .unwrap_or_else(|| "<unknown>".to_string())
                        });
                    ReportEntry::unplanned(source_path, e.to_string())
                }
            };
            observer(&entry);
            entries.push(entry);
        }

        Ok(Reconciled {
            refresh,
            entries,
            plan,
            interrupted,
        })
    }
}

fn canonical_root(role: RootRole, root: PathBuf) -> Result<PathBuf, SyncError> {
    dunce::canonicalize(&root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SyncError::path(role, &root, "does not exist"),
        _ => SyncError::path(role, &root, e.to_string()),
    })
}

/// Both roots must be existing directories, and neither may contain the other
fn validate_roots(
    fs: &dyn FileSystem,
    source_root: &Path,
    target_root: &Path,
) -> Result<(), SyncError> {
    for (role, root) in [(RootRole::Source, source_root), (RootRole::Target, target_root)] {
        let exists = fs
            .exists(root)
            .map_err(|e| SyncError::path(role, root, e.to_string()))?;
        if !exists {
            return Err(SyncError::path(role, root, "does not exist"));
        }
        if !fs.is_dir(root) {
            return Err(SyncError::path(role, root, "is not a directory"));
        }
    }
    if source_root == target_root {
        return Err(SyncError::path(
            RootRole::Target,
            target_root,
            "is the same directory as the source",
        ));
    }
    if target_root.starts_with(source_root) {
        return Err(SyncError::path(
            RootRole::Target,
            target_root,
            "is inside the source tree",
        ));
    }
    if source_root.starts_with(target_root) {
        return Err(SyncError::path(
            RootRole::Source,
            source_root,
            "is inside the target tree",
        ));
    }
    Ok(())
}

/// Dry runs work on a detached copy so nothing they do reaches the store
fn prepare_index(
    store: Option<Box<dyn IndexStore>>,
    dry_run: bool,
) -> Result<(TargetIndex, bool), StorageError> {
    match (store, dry_run) {
        (None, _) => Ok((TargetIndex::new(), false)),
        (Some(store), false) => TargetIndex::load_or_rebuild(store),
        (Some(store), true) => match TargetIndex::load(store) {
            Ok(index) => Ok((index.detached(), false)),
            Err(StorageError::IndexCorrupt(reason)) => {
                warn!(reason = %reason, "Persisted index is corrupt, dry run starts from an empty index");
                Ok((TargetIndex::new(), true))
            }
            Err(e) => Err(e),
        },
    }
}
