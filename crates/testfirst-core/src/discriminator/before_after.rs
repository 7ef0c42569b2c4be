//! First-appearance ordering of tests and sources.

use super::{Summary, check_snapshot, first_seen, paths};
use crate::binding::{Artifact, BindingGraph};
use crate::transaction::TransactionLog;
use crate::types::TfdError;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Sources by how they compare with each linked test.
#[derive(Debug, Default)]
pub(super) struct PairOrder<'g> {
    /// Test appeared before the source.
    pub before: BTreeSet<&'g Artifact>,
    /// Test appeared in the same commit as the source.
    pub same: BTreeSet<&'g Artifact>,
    /// Test appeared after the source.
    pub after: BTreeSet<&'g Artifact>,
}

/// Compare first appearances of every linked (test, source) pair.
pub(super) fn order_pairs<'g>(
    log: &TransactionLog,
    graph: &'g BindingGraph,
) -> Result<PairOrder<'g>, TfdError> {
    let index = log.name_index();
    check_snapshot(graph, &index)?;

    let mut ordering = PairOrder::default();
    for (test, sources) in graph.test_to_sources() {
        if sources.is_empty() {
            continue;
        }
        let (_, test_first) = first_seen(log, &index, test)?;
        for source in sources {
            let (_, source_first) = first_seen(log, &index, source)?;
            match test_first.cmp(&source_first) {
                Ordering::Less => ordering.before.insert(source),
                Ordering::Equal => ordering.same.insert(source),
                Ordering::Greater => ordering.after.insert(source),
            };
        }
    }
    Ok(ordering)
}

// =============================================================================
// BEFORE / AFTER
// =============================================================================

/// Test-first when every linked test appeared no later than the source.
#[derive(Debug, Clone, Copy)]
pub struct BeforeAfterDiscriminator<'a> {
    log: &'a TransactionLog,
    graph: &'a BindingGraph,
}

impl<'a> BeforeAfterDiscriminator<'a> {
    #[must_use]
    pub fn new(log: &'a TransactionLog, graph: &'a BindingGraph) -> Self {
        Self { log, graph }
    }

    pub fn statistics(&self) -> Result<BeforeAfterReport, TfdError> {
        let ordering = order_pairs(self.log, self.graph)?;
        let before: BTreeSet<&Artifact> =
            ordering.before.union(&ordering.same).copied().collect();
        Ok(BeforeAfterReport::new(
            paths(self.graph.sources()),
            paths(before),
            paths(ordering.after),
        ))
    }
}

/// Counts of the before/after classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BeforeAfterReport {
    /// Sources with a test no later than them, and none after.
    pub test_first: BTreeSet<String>,
    /// Sources with at least one test after them.
    pub test_after: BTreeSet<String>,
    /// Sources no test classified.
    pub untested: BTreeSet<String>,
}

impl BeforeAfterReport {
    /// Build from all sources and the aggregate before/after sets.
    #[must_use]
    pub fn new(
        sources: BTreeSet<String>,
        before: BTreeSet<String>,
        after: BTreeSet<String>,
    ) -> Self {
        let test_first = before.difference(&after).cloned().collect();
        let untested = sources
            .iter()
            .filter(|s| !before.contains(*s) && !after.contains(*s))
            .cloned()
            .collect();
        Self {
            test_first,
            test_after: after,
            untested,
        }
    }

    #[must_use]
    pub fn output(&self) -> String {
        format!(
            "Test First: {}\nTest After: {}\nUntested Files: {}\n",
            self.test_first.len(),
            self.test_after.len(),
            self.untested.len()
        )
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            test_first: self.test_first.len(),
            test_after: self.test_after.len(),
            untested: self.untested.len(),
        }
    }
}

// =============================================================================
// BEFORE / SAME / AFTER
// =============================================================================

/// Splits sources whose test arrived in the very same commit from those
/// whose test strictly preceded them.
#[derive(Debug, Clone, Copy)]
pub struct BeforeSameAfterDiscriminator<'a> {
    log: &'a TransactionLog,
    graph: &'a BindingGraph,
}

impl<'a> BeforeSameAfterDiscriminator<'a> {
    #[must_use]
    pub fn new(log: &'a TransactionLog, graph: &'a BindingGraph) -> Self {
        Self { log, graph }
    }

    pub fn statistics(&self) -> Result<BeforeSameAfterReport, TfdError> {
        let ordering = order_pairs(self.log, self.graph)?;
        let before = paths(ordering.before);
        let same = paths(ordering.same);
        let after = paths(ordering.after);

        let test_same: BTreeSet<String> = same.difference(&before).cloned().collect();
        let test_after: BTreeSet<String> = after
            .iter()
            .filter(|s| !before.contains(*s) && !same.contains(*s))
            .cloned()
            .collect();
        let untested = self
            .graph
            .sources()
            .iter()
            .map(|s| s.path().to_string())
            .filter(|s| !before.contains(s) && !same.contains(s) && !after.contains(s))
            .collect();

        Ok(BeforeSameAfterReport {
            test_first: before,
            test_same,
            test_after,
            untested,
        })
    }
}

/// Counts of the before/same/after classification.
///
/// A strict "before" wins over "same", which wins over "after".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BeforeSameAfterReport {
    pub test_first: BTreeSet<String>,
    pub test_same: BTreeSet<String>,
    pub test_after: BTreeSet<String>,
    pub untested: BTreeSet<String>,
}

impl BeforeSameAfterReport {
    #[must_use]
    pub fn output(&self) -> String {
        format!(
            "Test First: {}\nTest Same: {}\nTest After: {}\nUntested Files: {}\n",
            self.test_first.len(),
            self.test_same.len(),
            self.test_after.len(),
            self.untested.len()
        )
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            test_first: self.test_first.len() + self.test_same.len(),
            test_after: self.test_after.len(),
            untested: self.untested.len(),
        }
    }
}
