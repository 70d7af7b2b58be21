//! Properties of whole sync runs over generated trees
//!
//! Trees are drawn from small fixed name and content sets so duplicates,
//! occupied destinations and relocations show up often.

use proptest::collection::btree_map;
use proptest::prelude::*;
use proptest::sample::select;
use proptest::test_runner::{Config, TestRunner};
use relocase::fs::MemoryFs;
use relocase::store::MemoryIndexStore;
use relocase::sync::OccupiedPolicy;
use relocase::tree::hasher::compute_content_hash;
use relocase::types::Fingerprint;
use relocase::{RelocaseConfig, SyncAction, SyncReport, SyncSession};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

const SOURCE_NAMES: &[&str] = &["a.txt", "b/c.txt", "b/d.txt", "e.txt"];
const TARGET_NAMES: &[&str] = &["a.txt", "b/c.txt", "e.txt", "x/y.txt", "z.txt"];
const CONTENTS: &[&str] = &["one", "two", "three"];

type Tree = BTreeMap<&'static str, &'static str>;

fn tree_strategy(names: &'static [&'static str]) -> impl Strategy<Value = Tree> {
    btree_map(select(names), select(CONTENTS), 0..=names.len())
}

fn build(source: &Tree, target: &Tree) -> Arc<MemoryFs> {
    let fs = Arc::new(MemoryFs::new());
    fs.add_dir("/s");
    fs.add_dir("/t");
    for (name, content) in source {
        fs.add_file(format!("/s/{}", name), content);
    }
    for (name, content) in target {
        fs.add_file(format!("/t/{}", name), content);
    }
    fs
}

fn run(
    fs: &Arc<MemoryFs>,
    store: &MemoryIndexStore,
    dry_run: bool,
    policy: OccupiedPolicy,
) -> SyncReport {
    let mut config = RelocaseConfig::default();
    config.sync.on_occupied = policy;
    SyncSession::with_parts(
        "/s",
        "/t",
        dry_run,
        config,
        fs.clone(),
        Some(Box::new(store.clone())),
    )
    .unwrap()
    .run()
    .unwrap()
}

fn count_by_content(tree: &Tree) -> HashMap<Fingerprint, usize> {
    let mut counts = HashMap::new();
    for content in tree.values() {
        *counts.entry(compute_content_hash(content.as_bytes())).or_insert(0) += 1;
    }
    counts
}

fn trees() -> impl Strategy<Value = (Tree, Tree)> {
    (tree_strategy(SOURCE_NAMES), tree_strategy(TARGET_NAMES))
}

#[test]
fn test_dry_run_plan_equals_real_plan() {
    let mut runner = TestRunner::new(Config::with_cases(128));

    runner
        .run(&trees(), |(source, target)| {
            for policy in [OccupiedPolicy::Conflict, OccupiedPolicy::Overwrite] {
                let fs = build(&source, &target);
                let store = MemoryIndexStore::new();
                let before = fs.snapshot("/t");

                let dry = run(&fs, &store, true, policy);
                prop_assert_eq!(fs.snapshot("/t"), before);
                prop_assert!(store.is_empty());

                let real = run(&fs, &store, false, policy);
                prop_assert_eq!(&dry.plan, &real.plan);
                let dry_outcomes: Vec<_> = dry.entries.iter().map(|e| e.outcome).collect();
                let real_outcomes: Vec<_> = real.entries.iter().map(|e| e.outcome).collect();
                prop_assert_eq!(dry_outcomes, real_outcomes);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_overwrite_run_converges_and_is_idempotent() {
    let mut runner = TestRunner::new(Config::with_cases(128));

    runner
        .run(&trees(), |(source, target)| {
            let fs = build(&source, &target);
            let store = MemoryIndexStore::new();

            let first = run(&fs, &store, false, OccupiedPolicy::Overwrite);
            prop_assert!(!first.has_problems());

            let target_files = fs.snapshot("/t");
            for (name, content) in &source {
                prop_assert_eq!(
                    target_files.get(&PathBuf::from(name)).map(Vec::as_slice),
                    Some(content.as_bytes())
                );
            }

            let second = run(&fs, &store, false, OccupiedPolicy::Overwrite);
            prop_assert!(second.plan.iter().all(|p| p.action == SyncAction::Skip));
            prop_assert_eq!(second.refresh.hashed, 0);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_present_content_is_never_copied_again() {
    let mut runner = TestRunner::new(Config::with_cases(128));

    runner
        .run(&trees(), |(source, target)| {
            let fs = build(&source, &target);
            let report = run(&fs, &MemoryIndexStore::new(), false, OccupiedPolicy::Conflict);

            let in_source = count_by_content(&source);
            let in_target = count_by_content(&target);
            let mut copies: HashMap<Fingerprint, usize> = HashMap::new();
            for entry in report.plan.iter().filter(|p| p.action == SyncAction::Copy) {
                *copies.entry(entry.fingerprint).or_insert(0) += 1;
            }
            for (fingerprint, copied) in copies {
                let wanted = in_source.get(&fingerprint).copied().unwrap_or(0);
                let present = in_target.get(&fingerprint).copied().unwrap_or(0);
                prop_assert!(copied <= wanted.saturating_sub(present));
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_completed_entries_hold_source_content() {
    let mut runner = TestRunner::new(Config::with_cases(128));

    runner
        .run(&trees(), |(source, target)| {
            let fs = build(&source, &target);
            let report = run(&fs, &MemoryIndexStore::new(), false, OccupiedPolicy::Conflict);

            for entry in &report.entries {
                let on_disk = fs.read(format!("/t/{}", entry.target_path));
                if entry.outcome.is_problem() {
                    continue;
                }
                let expected = source[entry.source_path.as_str()];
                prop_assert_eq!(on_disk.as_deref(), Some(expected.as_bytes()));
            }
            prop_assert_eq!(
                fs.snapshot("/s").len(),
                source.len(),
                "source tree is never modified"
            );
            Ok(())
        })
        .unwrap();
}
