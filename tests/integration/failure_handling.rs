//! Per-file failures and conflicts never abort the run

use relocase::fs::MemoryFs;
use relocase::store::MemoryIndexStore;
use relocase::sync::OccupiedPolicy;
use relocase::{Outcome, RelocaseConfig, SyncAction, SyncError, SyncSession};
use std::sync::Arc;

fn run(fs: &Arc<MemoryFs>, config: RelocaseConfig) -> relocase::SyncReport {
    SyncSession::with_parts(
        "/src",
        "/dst",
        false,
        config,
        fs.clone(),
        Some(Box::new(MemoryIndexStore::new())),
    )
    .unwrap()
    .run()
    .unwrap()
}

fn outcome_of(report: &relocase::SyncReport, path: &str) -> Outcome {
    report
        .entries
        .iter()
        .find(|e| e.source_path == path)
        .map(|e| e.outcome)
        .unwrap()
}

#[test]
fn test_unwritable_destination_fails_single_file() {
    let fs = Arc::new(MemoryFs::new());
    fs.add_file("/src/locked/a.txt", "A");
    fs.add_file("/src/open/b.txt", "B");
    fs.add_dir("/dst/locked");
    fs.deny_write("/dst/locked");

    let report = run(&fs, RelocaseConfig::default());

    assert_eq!(outcome_of(&report, "locked/a.txt"), Outcome::Failed);
    assert_eq!(outcome_of(&report, "open/b.txt"), Outcome::Ok);
    assert!(report.has_problems());
    assert_eq!(report.problems().count(), 1);
    assert_eq!(fs.read("/dst/open/b.txt").unwrap(), b"B");
}

#[test]
fn test_unreadable_source_fails_single_file() {
    let fs = Arc::new(MemoryFs::new());
    fs.add_file("/src/a.txt", "A");
    fs.add_file("/src/b.txt", "B");
    fs.add_dir("/dst");
    fs.deny_read("/src/a.txt");

    let report = run(&fs, RelocaseConfig::default());

    assert_eq!(outcome_of(&report, "a.txt"), Outcome::Failed);
    assert_eq!(outcome_of(&report, "b.txt"), Outcome::Ok);
    assert!(fs.read("/dst/a.txt").is_none());
}

#[test]
fn test_unreadable_target_file_is_not_a_move_candidate() {
    let fs = Arc::new(MemoryFs::new());
    fs.add_file("/src/a.txt", "A");
    fs.add_file("/dst/hidden/a.txt", "A");
    fs.deny_read("/dst/hidden/a.txt");

    let report = run(&fs, RelocaseConfig::default());

    assert_eq!(report.refresh.unreadable, 1);
    assert_eq!(report.plan[0].action, SyncAction::Copy);
    assert_eq!(fs.read("/dst/a.txt").unwrap(), b"A");
    assert!(fs.read("/dst/hidden/a.txt").is_some());
}

#[test]
fn test_conflict_leaves_occupant_and_continues() {
    let fs = Arc::new(MemoryFs::new());
    fs.add_file("/src/a.txt", "new");
    fs.add_file("/src/b.txt", "B");
    fs.add_file("/dst/a.txt", "old");

    let report = run(&fs, RelocaseConfig::default());

    assert_eq!(outcome_of(&report, "a.txt"), Outcome::Conflict);
    assert_eq!(outcome_of(&report, "b.txt"), Outcome::Ok);
    assert_eq!(fs.read("/dst/a.txt").unwrap(), b"old");
    let detail = report.entries[0].detail.as_deref().unwrap();
    assert!(detail.contains("different content"));
}

#[test]
fn test_overwrite_policy_replaces_occupant() {
    let fs = Arc::new(MemoryFs::new());
    fs.add_file("/src/a.txt", "new");
    fs.add_file("/src/b.txt", "moved");
    fs.add_file("/dst/a.txt", "old");
    fs.add_file("/dst/b.txt", "stale");
    fs.add_file("/dst/elsewhere/m.txt", "moved");

    let mut config = RelocaseConfig::default();
    config.sync.on_occupied = OccupiedPolicy::Overwrite;
    let report = run(&fs, config);

    assert!(!report.has_problems());
    assert_eq!(report.counts().copied, 1);
    assert_eq!(report.counts().moved, 1);
    assert_eq!(fs.read("/dst/a.txt").unwrap(), b"new");
    assert_eq!(fs.read("/dst/b.txt").unwrap(), b"moved");
    assert!(!fs.contains_dir("/dst/elsewhere"));
}

#[test]
fn test_unindexed_destination_is_conflict() {
    let fs = Arc::new(MemoryFs::new());
    fs.add_file("/src/a.txt", "A");
    fs.add_dir("/dst/a.txt");

    let report = run(&fs, RelocaseConfig::default());

    assert_eq!(outcome_of(&report, "a.txt"), Outcome::Conflict);
    assert!(fs.contains_dir("/dst/a.txt"));
}

#[test]
fn test_missing_roots_are_fatal() {
    let fs = Arc::new(MemoryFs::new());
    fs.add_dir("/src");

    let result = SyncSession::with_parts(
        "/src",
        "/dst",
        false,
        RelocaseConfig::default(),
        fs.clone(),
        None,
    );
    assert!(matches!(result, Err(SyncError::Path { .. })));
}
