//! Reference-based binding.
//!
//! A test is linked to a source when one of the test's reference statements
//! names the source's canonical module. The transitive variant also follows
//! source → source references.

use super::name::report_unlinked;
use super::{Artifact, BindingGraph, BindingStrategy, Repository, StrategyKind};
use crate::language::Language;
use crate::types::TfdError;
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// What one file declares and references.
#[derive(Debug, Clone, Default)]
struct Extracted {
    module: Option<String>,
    references: BTreeSet<String>,
}

/// Per-run cache of module names and references.
///
/// Artifacts live in an arena: sources occupy `0..source_count`, tests follow.
/// The index is built once per [`BindingStrategy::graph`] call and dropped
/// with it.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    artifacts: Vec<Artifact>,
    extracted: Vec<Extracted>,
    position: BTreeMap<String, usize>,
    source_count: usize,
    /// Module name → source positions.
    by_module: BTreeMap<String, Vec<usize>>,
    /// Package → source positions, for wildcard references.
    by_package: BTreeMap<String, Vec<usize>>,
}

fn extract(
    repository: &Repository,
    language: &dyn Language,
    artifact: &Artifact,
) -> Result<Extracted, TfdError> {
    let lines = repository.read_lines(artifact)?;
    Ok(Extracted {
        module: language.module_name(artifact, &lines),
        references: language.references(&lines),
    })
}

impl ReferenceIndex {
    /// Read every file of `repository` and index what it declares.
    pub fn build(repository: &Repository) -> Result<Self, TfdError> {
        let language = repository.language();
        let artifacts: Vec<Artifact> = repository
            .sources()
            .iter()
            .chain(repository.tests())
            .cloned()
            .collect();
        let source_count = repository.sources().len();

        #[cfg(feature = "parallel")]
        let extracted: Result<Vec<Extracted>, TfdError> = artifacts
            .par_iter()
            .map(|artifact| extract(repository, language, artifact))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let extracted: Result<Vec<Extracted>, TfdError> = artifacts
            .iter()
            .map(|artifact| extract(repository, language, artifact))
            .collect();
        let extracted = extracted?;

        let mut by_module: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_package: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (slot, entry) in extracted.iter().enumerate().take(source_count) {
            let Some(module) = &entry.module else {
                continue;
            };
            by_module.entry(module.clone()).or_default().push(slot);
            if let Some((package, _)) = module.rsplit_once('.') {
                by_package.entry(package.to_string()).or_default().push(slot);
            }
        }

        let position = artifacts
            .iter()
            .enumerate()
            .map(|(slot, artifact)| (artifact.path().to_string(), slot))
            .collect();

        Ok(Self {
            artifacts,
            extracted,
            position,
            source_count,
            by_module,
            by_package,
        })
    }

    /// Canonical module name of an indexed artifact.
    #[must_use]
    pub fn module_name(&self, artifact: &Artifact) -> Option<&str> {
        self.slot(artifact)
            .and_then(|slot| self.extracted[slot].module.as_deref())
    }

    /// References declared by an indexed artifact.
    #[must_use]
    pub fn references(&self, artifact: &Artifact) -> Option<&BTreeSet<String>> {
        self.slot(artifact).map(|slot| &self.extracted[slot].references)
    }

    fn slot(&self, artifact: &Artifact) -> Option<usize> {
        self.position.get(artifact.path()).copied()
    }

    /// Source positions named by the references of `slot`.
    fn resolve(&self, slot: usize) -> BTreeSet<usize> {
        let mut found = BTreeSet::new();
        for reference in &self.extracted[slot].references {
            if let Some(sources) = self.by_module.get(reference) {
                found.extend(sources.iter().copied());
            } else if let Some(package) = reference.strip_suffix(".*") {
                if let Some(sources) = self.by_package.get(package) {
                    found.extend(sources.iter().copied());
                }
            }
        }
        found
    }

    /// Sources an artifact references directly.
    #[must_use]
    pub fn direct_links(&self, artifact: &Artifact) -> BTreeSet<Artifact> {
        self.slot(artifact)
            .map(|slot| self.artifacts_at(self.resolve(slot)))
            .unwrap_or_default()
    }

    /// Sources an artifact reaches through any chain of references.
    #[must_use]
    pub fn transitive_links(&self, artifact: &Artifact) -> BTreeSet<Artifact> {
        let Some(slot) = self.slot(artifact) else {
            return BTreeSet::new();
        };
        let adjacency: Vec<BTreeSet<usize>> =
            (0..self.source_count).map(|s| self.resolve(s)).collect();
        self.artifacts_at(self.reach(slot, &adjacency))
    }

    /// Worklist traversal over the source arena.
    fn reach(&self, start: usize, adjacency: &[BTreeSet<usize>]) -> BTreeSet<usize> {
        let mut visited = vec![false; self.source_count];
        let mut worklist: Vec<usize> = self.resolve(start).into_iter().collect();
        let mut reached = BTreeSet::new();

        while let Some(source) = worklist.pop() {
            if visited[source] {
                continue;
            }
            visited[source] = true;
            reached.insert(source);
            worklist.extend(adjacency[source].iter().filter(|&&next| !visited[next]));
        }
        reached
    }

    fn artifacts_at(&self, slots: BTreeSet<usize>) -> BTreeSet<Artifact> {
        slots
            .into_iter()
            .map(|slot| self.artifacts[slot].clone())
            .collect()
    }

    fn tests(&self) -> impl Iterator<Item = (usize, &Artifact)> {
        self.artifacts
            .iter()
            .enumerate()
            .skip(self.source_count)
    }
}

// =============================================================================
// STRATEGIES
// =============================================================================

/// Links each test to the sources it references.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceStrategy<'r> {
    repository: &'r Repository,
}

impl<'r> ReferenceStrategy<'r> {
    #[must_use]
    pub fn new(repository: &'r Repository) -> Self {
        Self { repository }
    }
}

impl BindingStrategy for ReferenceStrategy<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Reference
    }

    fn graph(&self) -> Result<BindingGraph, TfdError> {
        let index = ReferenceIndex::build(self.repository)?;
        let links = index
            .tests()
            .map(|(slot, test)| (test.clone(), index.artifacts_at(index.resolve(slot))))
            .collect();
        finish(self.repository, links, self.kind())
    }
}

/// Links each test to the sources it references, and to everything those
/// sources reference in turn.
#[derive(Debug, Clone, Copy)]
pub struct TransitiveReferenceStrategy<'r> {
    repository: &'r Repository,
}

impl<'r> TransitiveReferenceStrategy<'r> {
    #[must_use]
    pub fn new(repository: &'r Repository) -> Self {
        Self { repository }
    }
}

impl BindingStrategy for TransitiveReferenceStrategy<'_> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TransitiveReference
    }

    fn graph(&self) -> Result<BindingGraph, TfdError> {
        let index = ReferenceIndex::build(self.repository)?;
        // Computed once for all tests.
        let adjacency: Vec<BTreeSet<usize>> =
            (0..index.source_count).map(|s| index.resolve(s)).collect();
        let links = index
            .tests()
            .map(|(slot, test)| (test.clone(), index.artifacts_at(index.reach(slot, &adjacency))))
            .collect();
        finish(self.repository, links, self.kind())
    }
}

fn finish(
    repository: &Repository,
    links: BTreeMap<Artifact, BTreeSet<Artifact>>,
    kind: StrategyKind,
) -> Result<BindingGraph, TfdError> {
    let graph = BindingGraph::new(
        repository.sources().clone(),
        repository.tests().clone(),
        links,
    )?;
    report_unlinked(&graph, kind);
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::MemoryReader;
    use crate::language::LanguageKind;

    const TEST_BODY: &str = "@Test\nvoid t() {}\n}";

    fn java_repository() -> Repository {
        let reader = MemoryReader::new()
            .with_file("src/demo/A.java", "package demo;\nimport demo.B;\nclass A {}")
            .with_file("src/demo/B.java", "package demo;\nimport demo.C;\nclass B {}")
            .with_file("src/demo/C.java", "package demo;\nimport demo.A;\nclass C {}")
            .with_file("src/other/D.java", "package other;\nclass D {}")
            .with_file(
                "test/ATest.java",
                &format!("package demo;\nimport demo.A;\nclass ATest {{\n{TEST_BODY}"),
            )
            .with_file(
                "test/AllTest.java",
                &format!("package demo;\nimport other.*;\nclass AllTest {{\n{TEST_BODY}"),
            );
        Repository::in_memory("/repo", LanguageKind::Java, reader).expect("repo")
    }

    fn paths(graph: &BindingGraph, test: &str) -> Vec<String> {
        graph
            .sources_for(&Artifact::new("/repo", test))
            .map(|a| a.path().to_string())
            .collect()
    }

    #[test]
    fn direct_references_link_tests() {
        let repository = java_repository();
        let graph = ReferenceStrategy::new(&repository).graph().expect("graph");
        assert_eq!(paths(&graph, "test/ATest.java"), vec!["src/demo/A.java"]);
    }

    #[test]
    fn wildcard_imports_link_whole_package() {
        let repository = java_repository();
        let graph = ReferenceStrategy::new(&repository).graph().expect("graph");
        assert_eq!(paths(&graph, "test/AllTest.java"), vec!["src/other/D.java"]);
    }

    #[test]
    fn transitive_references_survive_cycles() {
        let repository = java_repository();
        let graph = TransitiveReferenceStrategy::new(&repository)
            .graph()
            .expect("graph");
        assert_eq!(
            paths(&graph, "test/ATest.java"),
            vec!["src/demo/A.java", "src/demo/B.java", "src/demo/C.java"]
        );
    }

    #[test]
    fn index_exposes_modules_and_links() {
        let repository = java_repository();
        let index = ReferenceIndex::build(&repository).expect("index");
        let a = Artifact::new("/repo", "src/demo/A.java");
        assert_eq!(index.module_name(&a), Some("demo.A"));
        assert!(index.references(&a).is_some_and(|refs| refs.contains("demo.B")));
        assert_eq!(index.direct_links(&a).len(), 1);
        assert_eq!(index.transitive_links(&a).len(), 3);
    }

    #[test]
    fn python_from_imports_link() {
        let reader = MemoryReader::new()
            .with_file("pkg/engine.py", "def run():\n    pass")
            .with_file("pkg/parser.py", "from pkg import engine")
            .with_file("tests/test_parser.py", "from pkg.parser import parse");
        let repository =
            Repository::in_memory("/repo", LanguageKind::Python, reader).expect("repo");

        let direct = StrategyKind::Reference.strategy(&repository).graph().expect("graph");
        assert_eq!(paths(&direct, "tests/test_parser.py"), vec!["pkg/parser.py"]);

        let transitive = StrategyKind::TransitiveReference
            .strategy(&repository)
            .graph()
            .expect("graph");
        assert_eq!(
            paths(&transitive, "tests/test_parser.py"),
            vec!["pkg/engine.py", "pkg/parser.py"]
        );
    }
}
