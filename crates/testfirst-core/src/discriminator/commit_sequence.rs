//! Commit-sequence classification.
//!
//! A source's history is cut into intervals, each ending at one of its
//! substantial edits: its creation, then every modification that introduces
//! at least one new symbol, until it is deleted. An interval qualifies when
//! a linked test received a substantial edit referencing the source's symbol
//! somewhere inside it, ends included. A source is test-first at a threshold
//! when the qualifying share of its intervals reaches the threshold.

use super::{Summary, check_snapshot, first_seen};
use crate::binding::{Artifact, BindingGraph};
use crate::config::Threshold;
use crate::transaction::{NameIndex, TransactionLog};
use crate::types::{ChangeEvent, FileId, ModificationKind, TfdError};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// CHANGE CLASSIFIER
// =============================================================================

/// Decides which edits count.
pub trait ChangeClassifier: fmt::Debug + Send + Sync {
    /// Whether an edit adds functionality.
    fn is_substantial(&self, event: &ChangeEvent) -> bool;

    /// Whether a test edit exercises `symbol`.
    fn references(&self, event: &ChangeEvent, symbol: &str) -> bool;
}

/// Classifies edits by their recorded symbol sets.
///
/// Creations are always substantial. Modifications are substantial when
/// they define a new symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolChangeClassifier {
    require_reference: bool,
}

impl SymbolChangeClassifier {
    /// With `require_reference` unset every substantial test edit counts.
    #[must_use]
    pub fn new(require_reference: bool) -> Self {
        Self { require_reference }
    }
}

impl Default for SymbolChangeClassifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ChangeClassifier for SymbolChangeClassifier {
    fn is_substantial(&self, event: &ChangeEvent) -> bool {
        match event.kind {
            ModificationKind::Add | ModificationKind::Copy => true,
            ModificationKind::Modify => !event.new_symbols.is_empty(),
            _ => false,
        }
    }

    fn references(&self, event: &ChangeEvent, symbol: &str) -> bool {
        !self.require_reference || event.referenced_symbols.contains(symbol)
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// One interval of a source's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: usize,
    /// The substantial source edit closing the interval.
    pub end: usize,
    /// Qualifying test edits: test path → commit numbers.
    pub hits: BTreeMap<String, Vec<usize>>,
}

impl Interval {
    #[must_use]
    pub fn qualifies(&self) -> bool {
        !self.hits.is_empty()
    }

    /// Whether a test edit landed in the closing commit itself.
    #[must_use]
    pub fn same_commit(&self) -> bool {
        self.hits.values().any(|commits| commits.contains(&self.end))
    }
}

/// The intervals of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub intervals: Vec<Interval>,
}

impl SourceStats {
    /// Number of qualifying intervals.
    #[must_use]
    pub fn qualifying(&self) -> usize {
        self.intervals.iter().filter(|i| i.qualifies()).count()
    }

    #[must_use]
    pub fn is_tfd(&self, threshold: Threshold) -> bool {
        threshold.admits(self.qualifying(), self.intervals.len())
    }

    /// Share of qualifying intervals with a same-commit test edit, in
    /// parts per million.
    fn same_commit_ppm(&self) -> usize {
        let qualifying = self.qualifying();
        if qualifying == 0 {
            return 0;
        }
        let same = self.intervals.iter().filter(|i| i.same_commit()).count();
        same * 1_000_000 / qualifying
    }
}

/// Classification at one threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdResult {
    pub threshold: Threshold,
    pub test_first: BTreeSet<String>,
    /// Tested sources that missed the threshold.
    pub test_elsewhere: BTreeSet<String>,
    /// Mean same-commit share over `test_first`, as a whole percentage.
    pub same_commit_percent: usize,
}

impl ThresholdResult {
    fn compute(threshold: Threshold, stats: &BTreeMap<String, SourceStats>) -> Self {
        let mut test_first = BTreeSet::new();
        let mut test_elsewhere = BTreeSet::new();
        let mut same_ppm = 0;
        for (source, stat) in stats {
            if stat.is_tfd(threshold) {
                test_first.insert(source.clone());
                same_ppm += stat.same_commit_ppm();
            } else {
                test_elsewhere.insert(source.clone());
            }
        }
        let same_commit_percent = if test_first.is_empty() {
            0
        } else {
            same_ppm / test_first.len() / 10_000
        };
        Self {
            threshold,
            test_first,
            test_elsewhere,
            same_commit_percent,
        }
    }
}

/// Commit-sequence classification of every tested source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitSequenceReport {
    /// Result at the threshold that decides the headline counts.
    pub primary: ThresholdResult,
    /// Results at every reported threshold.
    pub levels: Vec<ThresholdResult>,
    pub stats: BTreeMap<String, SourceStats>,
    /// Sources without any linked test.
    pub untested: BTreeSet<String>,
}

impl CommitSequenceReport {
    /// Evaluate `stats` at the primary and every reported threshold.
    #[must_use]
    pub fn new(
        stats: BTreeMap<String, SourceStats>,
        untested: BTreeSet<String>,
        primary: Threshold,
        thresholds: &[Threshold],
    ) -> Self {
        Self {
            primary: ThresholdResult::compute(primary, &stats),
            levels: thresholds
                .iter()
                .map(|&t| ThresholdResult::compute(t, &stats))
                .collect(),
            stats,
            untested,
        }
    }

    /// Sources classified test-first at `threshold`.
    #[must_use]
    pub fn test_first(&self, threshold: Threshold) -> BTreeSet<&str> {
        self.stats
            .iter()
            .filter(|(_, stat)| stat.is_tfd(threshold))
            .map(|(source, _)| source.as_str())
            .collect()
    }

    #[must_use]
    pub fn output(&self) -> String {
        let mut out = String::new();
        for level in &self.levels {
            out.push_str(&format!(
                "Threshold: {}\nTest First Updates: {}\nTest Elsewhere: {}\nSame Commit: {}%\n",
                level.threshold,
                level.test_first.len(),
                level.test_elsewhere.len(),
                level.same_commit_percent
            ));
        }
        out.push_str(&format!("Untested Files: {}\n", self.untested.len()));
        out
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            test_first: self.primary.test_first.len(),
            test_after: self.primary.test_elsewhere.len(),
            untested: self.untested.len(),
        }
    }
}

// =============================================================================
// DISCRIMINATOR
// =============================================================================

/// Test-first by sustained co-evolution of sources and their tests.
#[derive(Debug)]
pub struct CommitSequenceDiscriminator<'a> {
    log: &'a TransactionLog,
    graph: &'a BindingGraph,
    classifier: Box<dyn ChangeClassifier>,
    primary: Threshold,
    thresholds: Vec<Threshold>,
}

impl<'a> CommitSequenceDiscriminator<'a> {
    /// Uses [`SymbolChangeClassifier::default`] and the default thresholds.
    #[must_use]
    pub fn new(log: &'a TransactionLog, graph: &'a BindingGraph) -> Self {
        Self {
            log,
            graph,
            classifier: Box::new(SymbolChangeClassifier::default()),
            primary: Threshold::default(),
            thresholds: Threshold::defaults(),
        }
    }

    /// Replace the substantial-change classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn ChangeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set the deciding threshold and the reported ones.
    #[must_use]
    pub fn with_thresholds(mut self, primary: Threshold, thresholds: Vec<Threshold>) -> Self {
        self.primary = primary;
        self.thresholds = thresholds;
        self
    }

    pub fn statistics(&self) -> Result<CommitSequenceReport, TfdError> {
        let (stats, untested) = self.source_stats()?;
        Ok(CommitSequenceReport::new(
            stats,
            untested,
            self.primary,
            &self.thresholds,
        ))
    }

    /// Intervals of every tested source, and the untested sources.
    fn source_stats(
        &self,
    ) -> Result<(BTreeMap<String, SourceStats>, BTreeSet<String>), TfdError> {
        let index = self.log.name_index();
        check_snapshot(self.graph, &index)?;

        let reverse = self.graph.source_to_tests();
        let mut stats = BTreeMap::new();
        let mut untested = BTreeSet::new();

        for source in self.graph.sources() {
            let Some(tests) = reverse.get(source) else {
                untested.insert(source.path().to_string());
                continue;
            };
            let tests = tests
                .iter()
                .map(|test| index.require(test.path()).map(|id| (*test, id)))
                .collect::<Result<Vec<(&Artifact, FileId)>, TfdError>>()?;
            let stat = self.intervals(source, &tests, &index)?;
            stats.insert(source.path().to_string(), stat);
        }

        Ok((stats, untested))
    }

    fn intervals(
        &self,
        source: &Artifact,
        tests: &[(&Artifact, FileId)],
        index: &NameIndex,
    ) -> Result<SourceStats, TfdError> {
        let commits = self.log.commits();
        let (source_id, first) = first_seen(self.log, index, source)?;
        let symbol = source.stem();

        let mut intervals = Vec::new();
        let mut start = 0;
        let mut end = Some(first);

        while let Some(current) = end {
            let window = commits.get(start..=current).ok_or_else(|| {
                TfdError::SnapshotMismatch(format!(
                    "commit {} of '{}' is outside the log",
                    current, source
                ))
            })?;

            let mut hits: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (position, commit) in (start..).zip(window) {
                for (test, test_id) in tests {
                    let Some(event) = commit.change_for(*test_id) else {
                        continue;
                    };
                    if self.classifier.is_substantial(event)
                        && self.classifier.references(event, symbol)
                    {
                        hits.entry(test.path().to_string())
                            .or_default()
                            .push(position);
                    }
                }
            }
            intervals.push(Interval {
                start,
                end: current,
                hits,
            });

            start = current + 1;
            end = commits
                .iter()
                .enumerate()
                .skip(start)
                .find(|(_, commit)| {
                    commit
                        .change_for(source_id)
                        .is_some_and(|event| self.classifier.is_substantial(event))
                })
                .map(|(position, _)| position);
        }

        Ok(SourceStats { intervals })
    }
}
