//! Bipartite test ↔ source link structure.

use super::Artifact;
use crate::types::TfdError;
use std::collections::{BTreeMap, BTreeSet};

/// Sources, tests, and the links between them.
///
/// Every linked artifact belongs to its set; construction enforces this.
/// The source → test direction is derived from the test → source links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingGraph {
    sources: BTreeSet<Artifact>,
    tests: BTreeSet<Artifact>,
    links: BTreeMap<Artifact, BTreeSet<Artifact>>,
}

/// Links present in one graph but not the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDiff {
    pub only_left: BTreeMap<Artifact, BTreeSet<Artifact>>,
    pub only_right: BTreeMap<Artifact, BTreeSet<Artifact>>,
}

impl GraphDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.only_left.is_empty() && self.only_right.is_empty()
    }
}

impl BindingGraph {
    /// Build a graph from its sets and test → source links.
    ///
    /// Tests without links are kept as keys with an empty set.
    ///
    /// # Errors
    /// Returns `TfdError::InvalidGraph` if a link mentions a test or source
    /// outside the given sets.
    pub fn new(
        sources: BTreeSet<Artifact>,
        tests: BTreeSet<Artifact>,
        links: BTreeMap<Artifact, BTreeSet<Artifact>>,
    ) -> Result<Self, TfdError> {
        for (test, linked) in &links {
            if !tests.contains(test) {
                return Err(TfdError::InvalidGraph(format!(
                    "linked test '{}' is not in the test set",
                    test
                )));
            }
            if let Some(source) = linked.iter().find(|s| !sources.contains(*s)) {
                return Err(TfdError::InvalidGraph(format!(
                    "'{}' links to '{}', which is not in the source set",
                    test, source
                )));
            }
        }

        let mut links = links;
        for test in &tests {
            links.entry(test.clone()).or_default();
        }

        Ok(Self {
            sources,
            tests,
            links,
        })
    }

    #[must_use]
    pub fn sources(&self) -> &BTreeSet<Artifact> {
        &self.sources
    }

    #[must_use]
    pub fn tests(&self) -> &BTreeSet<Artifact> {
        &self.tests
    }

    /// Test → source links.
    #[must_use]
    pub fn test_to_sources(&self) -> &BTreeMap<Artifact, BTreeSet<Artifact>> {
        &self.links
    }

    /// Sources linked to `test`.
    pub fn sources_for(&self, test: &Artifact) -> impl Iterator<Item = &Artifact> {
        self.links.get(test).into_iter().flatten()
    }

    /// Source → test links, derived.
    #[must_use]
    pub fn source_to_tests(&self) -> BTreeMap<&Artifact, BTreeSet<&Artifact>> {
        let mut reverse: BTreeMap<&Artifact, BTreeSet<&Artifact>> = BTreeMap::new();
        for (test, sources) in &self.links {
            for source in sources {
                reverse.entry(source).or_default().insert(test);
            }
        }
        reverse
    }

    /// Test → source links by relative path.
    #[must_use]
    pub fn link_paths(&self) -> BTreeMap<&str, Vec<&str>> {
        self.links
            .iter()
            .map(|(test, sources)| (test.path(), sources.iter().map(Artifact::path).collect()))
            .collect()
    }

    /// Total number of test → source links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.values().map(BTreeSet::len).sum()
    }

    /// Tests without any link.
    pub fn unlinked_tests(&self) -> impl Iterator<Item = &Artifact> {
        self.links
            .iter()
            .filter(|(_, sources)| sources.is_empty())
            .map(|(test, _)| test)
    }

    /// Union of two graphs.
    ///
    /// An artifact classified as a test in either graph is a test in the result.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        let tests: BTreeSet<Artifact> = self.tests.union(&other.tests).cloned().collect();
        let sources: BTreeSet<Artifact> = self
            .sources
            .union(&other.sources)
            .filter(|a| !tests.contains(*a))
            .cloned()
            .collect();

        let mut links: BTreeMap<Artifact, BTreeSet<Artifact>> = BTreeMap::new();
        for (test, linked) in self.links.iter().chain(&other.links) {
            links
                .entry(test.clone())
                .or_default()
                .extend(linked.iter().filter(|s| sources.contains(*s)).cloned());
        }

        Self {
            sources,
            tests,
            links,
        }
    }

    /// Keep only artifacts for which `keep` holds.
    #[must_use]
    pub fn restrict<F>(&self, keep: F) -> Self
    where
        F: Fn(&Artifact) -> bool,
    {
        let sources: BTreeSet<Artifact> =
            self.sources.iter().filter(|&a| keep(a)).cloned().collect();
        let tests: BTreeSet<Artifact> = self.tests.iter().filter(|&a| keep(a)).cloned().collect();
        let links = self
            .links
            .iter()
            .filter(|(test, _)| tests.contains(*test))
            .map(|(test, linked)| {
                let kept = linked.iter().filter(|s| sources.contains(*s)).cloned().collect();
                (test.clone(), kept)
            })
            .collect();

        Self {
            sources,
            tests,
            links,
        }
    }

    /// Links in `self` missing from `other`, and the reverse.
    #[must_use]
    pub fn diff(&self, other: &Self) -> GraphDiff {
        GraphDiff {
            only_left: missing_links(&self.links, &other.links),
            only_right: missing_links(&other.links, &self.links),
        }
    }
}

fn missing_links(
    from: &BTreeMap<Artifact, BTreeSet<Artifact>>,
    against: &BTreeMap<Artifact, BTreeSet<Artifact>>,
) -> BTreeMap<Artifact, BTreeSet<Artifact>> {
    let empty = BTreeSet::new();
    from.iter()
        .filter_map(|(test, linked)| {
            let other = against.get(test).unwrap_or(&empty);
            let missing: BTreeSet<Artifact> = linked.difference(other).cloned().collect();
            (!missing.is_empty()).then(|| (test.clone(), missing))
        })
        .collect()
}
