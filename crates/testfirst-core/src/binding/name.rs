//! Name-based binding: `EngineTest` exercises `Engine`.

use super::{Artifact, BindingGraph, BindingStrategy, Repository, StrategyKind};
use crate::types::TfdError;
use std::collections::{BTreeMap, BTreeSet};

/// Links a test to every source whose stem equals the test stem with its
/// naming convention stripped.
#[derive(Debug, Clone, Copy)]
pub struct NameStrategy<'r> {
    repository: &'r Repository,
}

impl<'r> NameStrategy<'r> {
    #[must_use]
    pub fn new(repository: &'r Repository) -> Self {
        Self { repository }
    }
}

impl BindingStrategy for NameStrategy<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Name
    }

    fn graph(&self) -> Result<BindingGraph, TfdError> {
        let language = self.repository.language();

        let mut by_stem: BTreeMap<&str, Vec<&Artifact>> = BTreeMap::new();
        for source in self.repository.sources() {
            by_stem.entry(source.stem()).or_default().push(source);
        }

        let mut links: BTreeMap<Artifact, BTreeSet<Artifact>> = BTreeMap::new();
        for test in self.repository.tests() {
            let linked = language
                .test_subject(test.stem())
                .and_then(|subject| by_stem.get(subject.as_str()))
                .map(|sources| sources.iter().map(|s| (*s).clone()).collect())
                .unwrap_or_default();
            links.insert(test.clone(), linked);
        }

        let graph = BindingGraph::new(
            self.repository.sources().clone(),
            self.repository.tests().clone(),
            links,
        )?;
        report_unlinked(&graph, StrategyKind::Name);
        Ok(graph)
    }
}

/// Log the tests a strategy could not link.
pub(super) fn report_unlinked(graph: &BindingGraph, kind: StrategyKind) {
    let unlinked: Vec<&str> = graph.unlinked_tests().map(Artifact::path).collect();
    if !unlinked.is_empty() {
        tracing::warn!(
            strategy = %kind,
            count = unlinked.len(),
            tests = ?unlinked,
            "tests without linked sources"
        );
    }
    tracing::info!(
        strategy = %kind,
        sources = graph.sources().len(),
        tests = graph.tests().len(),
        links = graph.link_count(),
        "built binding graph"
    );
}
