//! # Pipeline Benchmarks
//!
//! Alignment, log building and classification on synthetic histories.
//!
//! Run with: `cargo bench -p testfirst-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::{BTreeMap, BTreeSet};
use std::hint::black_box;
use testfirst_core::{
    Artifact, BindingGraph, CommitAligner, CommitRecord, CommitSequenceDiscriminator, History,
    RawChange,
};

/// Main line of `size` commits with a three-commit branch merged every
/// tenth commit. Each commit touches one source and one test.
fn create_branched_history(size: usize) -> Vec<CommitRecord> {
    let mut records = Vec::new();
    let mut previous: Option<String> = None;

    for i in 0..size {
        let hash = format!("m{i}");
        let mut parents: Vec<String> = previous.iter().cloned().collect();

        if i % 10 == 9 {
            let mut parent = format!("m{}", i - 1);
            for step in 0..3 {
                let side = format!("b{i}_{step}");
                records.push(
                    CommitRecord::new(side.clone(), [parent])
                        .with_change(RawChange::add(format!("Side{i}_{step}.java"))),
                );
                parent = side;
            }
            parents.push(parent);
        }

        let source = format!("S{}.java", i % 50);
        let test = format!("S{}Test.java", i % 50);
        records.push(
            CommitRecord::new(hash.clone(), parents)
                .with_change(RawChange::modify(source).with_new_symbols([format!("m{i}")]))
                .with_change(
                    RawChange::modify(test)
                        .with_new_symbols([format!("t{i}")])
                        .with_references([format!("S{}", i % 50)]),
                ),
        );
        previous = Some(hash);
    }
    records
}

fn create_graph() -> BindingGraph {
    let artifact = |path: String| Artifact::new("/bench", path);
    let sources: BTreeSet<Artifact> = (0..50).map(|i| artifact(format!("S{i}.java"))).collect();
    let tests: BTreeSet<Artifact> = (0..50).map(|i| artifact(format!("S{i}Test.java"))).collect();
    let links: BTreeMap<Artifact, BTreeSet<Artifact>> = (0..50)
        .map(|i| {
            (
                artifact(format!("S{i}Test.java")),
                BTreeSet::from([artifact(format!("S{i}.java"))]),
            )
        })
        .collect();
    BindingGraph::new(sources, tests, links).expect("graph")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("align");

    for size in [100, 1000, 5000].iter() {
        let records = create_branched_history(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let aligned = CommitAligner::new(records.clone())
                    .and_then(|aligner| aligner.align());
                black_box(aligned)
            });
        });
    }

    group.finish();
}

fn bench_build_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_history");

    for size in [100, 1000, 5000].iter() {
        let records = create_branched_history(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(History::from_records(records.clone())));
        });
    }

    group.finish();
}

fn bench_commit_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_sequence");
    let graph = create_graph();

    for size in [100, 1000].iter() {
        let history = History::from_records(create_branched_history(*size)).expect("history");
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let report = CommitSequenceDiscriminator::new(history.log(), &graph).statistics();
                black_box(report)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_align, bench_build_history, bench_commit_sequence);

criterion_main!(benches);
