//! # Property-Based Tests
//!
//! Invariants of alignment and classification over generated histories.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use testfirst_core::{
    Artifact, BeforeAfterDiscriminator, BindingGraph, CommitAligner, CommitRecord,
    CommitSequenceDiscriminator, History, RawChange, Threshold,
};

// =============================================================================
// GENERATORS
// =============================================================================

/// A main line of `main_len` commits plus side branches given as
/// (fork offset, merge distance, length).
fn branched_history(main_len: usize, branches: &[(usize, usize, usize)]) -> Vec<CommitRecord> {
    let main: Vec<String> = (0..main_len).map(|i| format!("m{i}")).collect();
    let mut extra: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let mut records = Vec::new();

    for (b, &(fork, distance, length)) in branches.iter().enumerate() {
        let fork = fork % (main_len - 1);
        let merge = (fork + 1 + distance % (main_len - 1 - fork)).min(main_len - 1);
        let mut parent = main[fork].clone();
        for step in 0..length {
            let hash = format!("b{b}_{step}");
            records.push(CommitRecord::new(hash.clone(), [parent]));
            parent = hash;
        }
        extra.entry(merge).or_default().push(parent);
    }

    for (i, hash) in main.iter().enumerate() {
        let mut parents: Vec<String> = if i == 0 {
            Vec::new()
        } else {
            vec![main[i - 1].clone()]
        };
        parents.extend(extra.remove(&i).unwrap_or_default());
        records.push(CommitRecord::new(hash.clone(), parents));
    }
    records
}

/// A single-root DAG. Commit `i` takes a first parent and extra parents
/// among earlier commits, so merges nest, cross branches, and may be
/// octopus merges. A final commit merges every remaining tip, newest
/// first.
fn random_dag(picks: &[(usize, Vec<usize>)]) -> Vec<CommitRecord> {
    let mut parents: Vec<Vec<usize>> = vec![Vec::new()];
    for (i, (first, extra)) in picks.iter().enumerate() {
        let earlier = i + 1;
        let mut chosen = vec![first % earlier];
        for pick in extra {
            let parent = pick % earlier;
            if !chosen.contains(&parent) {
                chosen.push(parent);
            }
        }
        parents.push(chosen);
    }

    let mut has_child = vec![false; parents.len()];
    for list in &parents {
        for &parent in list {
            has_child[parent] = true;
        }
    }
    let tips: Vec<usize> = (0..parents.len()).rev().filter(|&i| !has_child[i]).collect();
    if tips.len() > 1 {
        parents.push(tips);
    }

    parents
        .iter()
        .enumerate()
        .map(|(i, list)| {
            CommitRecord::new(format!("d{i}"), list.iter().map(|p| format!("d{p}")))
        })
        .collect()
}

fn history_strategy() -> impl Strategy<Value = Vec<CommitRecord>> {
    prop_oneof![
        (2usize..12, vec((0usize..64, 0usize..64, 1usize..5), 0..6))
            .prop_map(|(main_len, branches)| branched_history(main_len, &branches)),
        vec((0usize..64, vec(0usize..64, 0..3)), 0..24).prop_map(|picks| random_dag(&picks)),
    ]
}

/// One commit adding `sources` sources with a linked test each, then one
/// commit per step. A step edits a test (`true`) or a source, optionally
/// defining a new symbol, and names the source it references.
fn co_evolving(sources: usize, steps: &[(bool, usize, bool, usize)]) -> (History, BindingGraph) {
    let source_path = |i: usize| format!("S{i}.java");
    let test_path = |i: usize| format!("S{i}Test.java");

    let mut first = CommitRecord::new("c0", Vec::<String>::new());
    for i in 0..sources {
        first = first
            .with_change(RawChange::add(source_path(i)))
            .with_change(RawChange::add(test_path(i)).with_references([format!("S{i}")]));
    }
    let mut records = vec![first];
    for (n, &(on_test, target, new_symbol, reference)) in steps.iter().enumerate() {
        let target = target % sources;
        let path = if on_test { test_path(target) } else { source_path(target) };
        let mut change =
            RawChange::modify(path).with_references([format!("S{}", reference % sources)]);
        if new_symbol {
            change = change.with_new_symbols([format!("m{n}")]);
        }
        records.push(
            CommitRecord::new(format!("c{}", n + 1), [format!("c{n}")]).with_change(change),
        );
    }

    let history = History::from_linear(&records).expect("history");
    let source_set: BTreeSet<Artifact> = (0..sources)
        .map(|i| Artifact::new("/p", &source_path(i)))
        .collect();
    let test_set: BTreeSet<Artifact> = (0..sources)
        .map(|i| Artifact::new("/p", &test_path(i)))
        .collect();
    let links = (0..sources)
        .map(|i| {
            (
                Artifact::new("/p", &test_path(i)),
                BTreeSet::from([Artifact::new("/p", &source_path(i))]),
            )
        })
        .collect();
    let graph = BindingGraph::new(source_set, test_set, links).expect("graph");
    (history, graph)
}

// =============================================================================
// ALIGNMENT
// =============================================================================

proptest! {
    /// Alignment keeps every commit, leaves at most one parent each and
    /// respects every declared parent edge.
    #[test]
    fn alignment_is_complete(records in history_strategy()) {
        let aligned = CommitAligner::new(records.clone())
            .expect("aligner")
            .align()
            .expect("align");

        prop_assert_eq!(aligned.len(), records.len());
        let position: BTreeMap<&str, usize> = aligned
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash.as_str(), i))
            .collect();
        prop_assert_eq!(position.len(), records.len());

        for (i, commit) in aligned.iter().enumerate() {
            prop_assert!(commit.parents.len() <= 1);
            if i > 0 {
                prop_assert_eq!(&commit.parents[0], &aligned[i - 1].hash);
            }
        }
        for record in &records {
            for parent in &record.parents {
                prop_assert!(position[parent.as_str()] < position[record.hash.as_str()]);
            }
        }
    }

    /// Aligning twice yields the same sequence.
    #[test]
    fn alignment_is_idempotent(records in history_strategy()) {
        let once = CommitAligner::new(records).expect("aligner").align().expect("align");
        let twice = CommitAligner::new(once.clone()).expect("aligner").align().expect("align");
        prop_assert_eq!(once, twice);
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

proptest! {
    /// Raising the threshold never admits more.
    #[test]
    fn threshold_is_monotone(
        total in 0usize..50,
        qualifying_seed in 0usize..50,
        low in 0u16..=1000,
        high in 0u16..=1000,
    ) {
        let qualifying = qualifying_seed.min(total);
        let (low, high) = (low.min(high), low.max(high));
        let low = Threshold::from_permille(low).expect("low");
        let high = Threshold::from_permille(high).expect("high");
        if high.admits(qualifying, total) {
            prop_assert!(low.admits(qualifying, total));
        }
    }

    /// A source test-first at one threshold stays test-first at every
    /// lower threshold.
    #[test]
    fn commit_sequence_is_monotone_in_threshold(
        sources in 1usize..5,
        steps in vec((any::<bool>(), 0usize..8, any::<bool>(), 0usize..8), 0..24),
        permilles in vec(0u16..=1000, 1..6),
    ) {
        let (history, graph) = co_evolving(sources, &steps);
        let mut thresholds: Vec<Threshold> = permilles
            .into_iter()
            .map(|p| Threshold::from_permille(p).expect("threshold"))
            .collect();
        thresholds.sort_unstable_by(|a, b| b.cmp(a));
        thresholds.dedup();

        let report = CommitSequenceDiscriminator::new(history.log(), &graph)
            .with_thresholds(thresholds[0], thresholds.clone())
            .statistics()
            .expect("statistics");

        for pair in thresholds.windows(2) {
            let higher = report.test_first(pair[0]);
            let lower = report.test_first(pair[1]);
            prop_assert!(higher.is_subset(&lower), "{} vs {}", pair[0], pair[1]);
        }
        for pair in report.levels.windows(2) {
            prop_assert!(pair[0].test_first.is_subset(&pair[1].test_first));
        }
    }

    /// Test-first, test-after and untested partition the sources.
    #[test]
    fn before_after_partitions_sources(
        placements in vec((0usize..8, proptest::option::of(0usize..8)), 1..12)
    ) {
        let mut commits: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        let mut links = BTreeMap::new();
        let mut sources = BTreeSet::new();
        let mut tests = BTreeSet::new();

        for (i, (source_at, test_at)) in placements.iter().enumerate() {
            let source = format!("S{i}.java");
            commits.entry(*source_at).or_default().push(source.clone());
            sources.insert(Artifact::new("/p", &source));
            if let Some(test_at) = test_at {
                let test = format!("S{i}Test.java");
                commits.entry(*test_at).or_default().push(test.clone());
                tests.insert(Artifact::new("/p", &test));
                links.insert(
                    Artifact::new("/p", &test),
                    BTreeSet::from([Artifact::new("/p", &source)]),
                );
            }
        }

        let records: Vec<CommitRecord> = commits
            .values()
            .enumerate()
            .map(|(n, files)| {
                files.iter().fold(
                    CommitRecord::new(format!("c{n}"), Vec::<String>::new()),
                    |record, file| record.with_change(RawChange::add(file.as_str())),
                )
            })
            .collect();
        let history = History::from_linear(&records).expect("history");
        let graph = BindingGraph::new(sources.clone(), tests, links).expect("graph");

        let report = BeforeAfterDiscriminator::new(history.log(), &graph)
            .statistics()
            .expect("statistics");

        prop_assert!(report.test_first.is_disjoint(&report.test_after));
        prop_assert!(report.untested.is_disjoint(&report.test_first));
        prop_assert!(report.untested.is_disjoint(&report.test_after));
        prop_assert_eq!(
            report.test_first.len() + report.test_after.len() + report.untested.len(),
            sources.len()
        );
    }
}
