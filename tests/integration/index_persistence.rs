//! Sled-backed index across sessions, including corruption recovery

use crate::integration::test_utils::{read_tree, Roots};
use relocase::store::{IndexStore, SledIndexStore};
use relocase::sync::index_path;
use relocase::tree::hasher::compute_content_hash;
use relocase::{RelocaseConfig, SyncSession};

#[test]
fn test_index_survives_reopen() {
    let roots = Roots::new(&[("a.txt", "X"), ("b/c.txt", "Y")], &[("old.txt", "X")]);
    roots.sync(false);

    let store = SledIndexStore::new(index_path(&roots.target(), ".relocase")).unwrap();
    let mut paths: Vec<String> = store.load().unwrap().into_iter().map(|e| e.path).collect();
    paths.sort();
    assert_eq!(paths, vec!["a.txt", "b/c.txt"]);
}

#[test]
fn test_unchanged_files_are_not_rehashed() {
    let roots = Roots::new(&[("a.txt", "X")], &[("t1.txt", "1"), ("t2.txt", "2")]);
    let first = roots.sync(false);
    assert_eq!(first.refresh.hashed, 2);

    let second = roots.sync(false);
    assert_eq!(second.refresh.scanned, 3);
    assert_eq!(second.refresh.hashed, 0);
}

#[test]
fn test_changed_target_file_is_rehashed() {
    let roots = Roots::new(&[("a.txt", "X")], &[("a.txt", "X")]);
    roots.sync(false);

    std::fs::write(roots.target().join("a.txt"), "changed content").unwrap();
    let report = roots.sync(false);

    assert_eq!(report.refresh.updated, 1);
    assert_eq!(report.counts().conflicts, 1);
}

#[test]
fn test_deleted_target_file_leaves_index() {
    let roots = Roots::new(&[("a.txt", "X")], &[("a.txt", "X"), ("gone.txt", "G")]);
    roots.sync(false);

    std::fs::remove_file(roots.target().join("gone.txt")).unwrap();
    let report = roots.sync(false);
    assert_eq!(report.refresh.removed, 1);

    let store = SledIndexStore::new(index_path(&roots.target(), ".relocase")).unwrap();
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn test_corrupt_entry_triggers_rebuild() {
    let roots = Roots::new(&[("a.txt", "X")], &[("old/b.txt", "X")]);
    {
        let store = SledIndexStore::new(index_path(&roots.target(), ".relocase")).unwrap();
        store.db().insert(b"entry/bogus.txt", &b"\xff\x00"[..]).unwrap();
        store.flush().unwrap();
    }

    let report = roots.sync(false);

    assert!(report.index_rebuilt);
    assert_eq!(report.counts().moved, 1);
    assert_eq!(read_tree(&roots.target()).len(), 1);

    let store = SledIndexStore::new(index_path(&roots.target(), ".relocase")).unwrap();
    let entries = store.load().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "a.txt");
    assert_eq!(entries[0].fingerprint, compute_content_hash(b"X"));
}

#[test]
fn test_dry_run_reports_corruption_without_repair() {
    let roots = Roots::new(&[("a.txt", "X")], &[("a.txt", "X")]);
    {
        let store = SledIndexStore::new(index_path(&roots.target(), ".relocase")).unwrap();
        store.db().insert(b"meta/format", &99u32.to_be_bytes()[..]).unwrap();
        store.flush().unwrap();
    }

    let dry = roots.sync(true);
    assert!(dry.index_rebuilt);
    assert_eq!(dry.counts().skipped, 1);

    // Still corrupt on disk: the real run performs the rebuild
    let real = roots.sync(false);
    assert!(real.index_rebuilt);
    let again = roots.sync(false);
    assert!(!again.index_rebuilt);
}

#[test]
fn test_custom_index_name() {
    let roots = Roots::new(&[("a.txt", "X")], &[]);
    let mut config = RelocaseConfig::default();
    config.index.dir_name = ".sync-index".to_string();

    let mut session = SyncSession::open(roots.source(), roots.target(), false, config).unwrap();
    session.run().unwrap();
    drop(session);

    assert!(index_path(&roots.target(), ".sync-index").exists());
    assert!(!roots.target().join(".relocase").exists());
}
