//! Branch-aware classification.
//!
//! Every merged side branch is classified on its own scoped log, against the
//! part of the binding graph that branch actually touched. Results are then
//! merged: a source counted "after" on any branch is test-after overall.

use super::before_after::{BeforeAfterReport, order_pairs};
use super::commit_sequence::{CommitSequenceDiscriminator, SymbolChangeClassifier};
use super::{BranchMode, Summary, paths};
use crate::binding::BindingGraph;
use crate::config::Threshold;
use crate::history::BranchHistory;
use crate::types::TfdError;
use serde::Serialize;
use std::collections::BTreeSet;

/// Classification of one merged branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchResult {
    /// Merge commit on the main branch.
    pub merge: String,
    pub head: String,
    pub tail: String,
    pub before: BTreeSet<String>,
    pub after: BTreeSet<String>,
    pub untested: BTreeSet<String>,
}

/// Per-branch results and their aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchReport {
    pub branches: Vec<BranchResult>,
    pub totals: BeforeAfterReport,
}

impl BranchReport {
    #[must_use]
    pub fn output(&self) -> String {
        let mut out = String::new();
        for branch in &self.branches {
            out.push_str(&format!(
                "Branch: {} -> {}\nBefore: {}\nAfter: {}\nUntested: {}\n",
                branch.head,
                branch.tail,
                branch.before.len(),
                branch.after.len(),
                branch.untested.len()
            ));
        }
        out.push_str(&self.totals.output());
        out
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        self.totals.summary()
    }
}

/// Runs a per-branch classification over every merged branch.
#[derive(Debug, Clone, Copy)]
pub struct BranchDiscriminator<'a> {
    branches: &'a [BranchHistory],
    graph: &'a BindingGraph,
    mode: BranchMode,
    classifier: SymbolChangeClassifier,
    threshold: Threshold,
}

impl<'a> BranchDiscriminator<'a> {
    #[must_use]
    pub fn new(
        branches: &'a [BranchHistory],
        graph: &'a BindingGraph,
        mode: BranchMode,
        classifier: SymbolChangeClassifier,
        threshold: Threshold,
    ) -> Self {
        Self {
            branches,
            graph,
            mode,
            classifier,
            threshold,
        }
    }

    pub fn statistics(&self) -> Result<BranchReport, TfdError> {
        let mut results = Vec::with_capacity(self.branches.len());
        let mut sources = BTreeSet::new();
        let mut before = BTreeSet::new();
        let mut after = BTreeSet::new();

        for history in self.branches {
            let index = history.log.name_index();
            let graph = self.graph.restrict(|artifact| index.contains(artifact.path()));
            let result = self.classify(history, &graph)?;

            tracing::debug!(
                merge = %result.merge,
                before = result.before.len(),
                after = result.after.len(),
                untested = result.untested.len(),
                "classified branch"
            );

            sources.extend(paths(graph.sources()));
            before.extend(result.before.iter().cloned());
            after.extend(result.after.iter().cloned());
            results.push(result);
        }

        Ok(BranchReport {
            branches: results,
            totals: BeforeAfterReport::new(sources, before, after),
        })
    }

    fn classify(
        &self,
        history: &BranchHistory,
        graph: &BindingGraph,
    ) -> Result<BranchResult, TfdError> {
        let (before, after, untested) = match self.mode {
            BranchMode::BeforeAfter => {
                let ordering = order_pairs(&history.log, graph)?;
                let before = paths(ordering.before.union(&ordering.same).copied());
                let after = paths(ordering.after);
                let untested = graph
                    .sources()
                    .iter()
                    .map(|s| s.path().to_string())
                    .filter(|s| !before.contains(s) && !after.contains(s))
                    .collect();
                (before, after, untested)
            }
            BranchMode::CommitSequence => {
                let report = CommitSequenceDiscriminator::new(&history.log, graph)
                    .with_classifier(Box::new(self.classifier))
                    .with_thresholds(self.threshold, vec![self.threshold])
                    .statistics()?;
                let before: BTreeSet<String> = report
                    .test_first(self.threshold)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                let after = report
                    .stats
                    .keys()
                    .filter(|s| !before.contains(*s))
                    .cloned()
                    .collect();
                (before, after, report.untested)
            }
        };

        Ok(BranchResult {
            merge: history.branch.merge.clone(),
            head: history.branch.head().unwrap_or_default().to_string(),
            tail: history.branch.tail().unwrap_or_default().to_string(),
            before,
            after,
            untested,
        })
    }
}
