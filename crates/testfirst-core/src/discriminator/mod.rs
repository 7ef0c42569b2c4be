//! # Discriminators
//!
//! Classification algorithms over a transaction log and a binding graph.
//!
//! | Kind | Classifies a source as test-first when |
//! |------|-----------------------------------------|
//! | `BeforeAfter` | every linked test appeared no later than the source |
//! | `BeforeSameAfter` | as above, with "same commit" split out |
//! | `CommitSequence` | enough of its substantial edits were preceded by test edits |
//! | `Branch` | `BeforeAfter` or `CommitSequence`, per merged branch |
//!
//! Discriminators never mutate their inputs. A graph artifact unknown to the
//! log aborts the run with `TfdError::SnapshotMismatch`.

mod before_after;
mod branch;
mod commit_sequence;

pub use before_after::{
    BeforeAfterDiscriminator, BeforeAfterReport, BeforeSameAfterDiscriminator,
    BeforeSameAfterReport,
};
pub use branch::{BranchDiscriminator, BranchReport, BranchResult};
pub use commit_sequence::{
    ChangeClassifier, CommitSequenceDiscriminator, CommitSequenceReport, Interval,
    SourceStats, SymbolChangeClassifier, ThresholdResult,
};

use crate::binding::{Artifact, BindingGraph};
use crate::config::AnalysisConfig;
use crate::history::BranchHistory;
use crate::transaction::{NameIndex, TransactionLog};
use crate::types::{FileId, TfdError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// KINDS
// =============================================================================

/// Available discriminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscriminatorKind {
    #[default]
    BeforeAfter,
    BeforeSameAfter,
    CommitSequence,
    Branch,
}

impl DiscriminatorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeAfter => "before_after",
            Self::BeforeSameAfter => "before_same_after",
            Self::CommitSequence => "commit_sequence",
            Self::Branch => "branch",
        }
    }
}

impl fmt::Display for DiscriminatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscriminatorKind {
    type Err = TfdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "before_after" => Ok(Self::BeforeAfter),
            "before_same_after" => Ok(Self::BeforeSameAfter),
            "commit_sequence" => Ok(Self::CommitSequence),
            "branch" => Ok(Self::Branch),
            other => Err(TfdError::InvalidRecord(format!(
                "unknown discriminator '{}'",
                other
            ))),
        }
    }
}

/// Classification applied to each branch by the branch-aware discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BranchMode {
    #[default]
    BeforeAfter,
    CommitSequence,
}

impl FromStr for BranchMode {
    type Err = TfdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "before_after" => Ok(Self::BeforeAfter),
            "commit_sequence" => Ok(Self::CommitSequence),
            other => Err(TfdError::InvalidRecord(format!(
                "unknown branch mode '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// INPUT & FACTORY
// =============================================================================

/// Everything a discriminator reads.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisInput<'a> {
    pub log: &'a TransactionLog,
    pub graph: &'a BindingGraph,
    /// Per-branch logs; only the branch-aware discriminator needs them.
    pub branches: Option<&'a [BranchHistory]>,
}

impl<'a> AnalysisInput<'a> {
    #[must_use]
    pub fn new(log: &'a TransactionLog, graph: &'a BindingGraph) -> Self {
        Self {
            log,
            graph,
            branches: None,
        }
    }

    #[must_use]
    pub fn with_branches(mut self, branches: &'a [BranchHistory]) -> Self {
        self.branches = Some(branches);
        self
    }
}

/// A configured discriminator.
#[derive(Debug)]
pub enum Discriminator<'a> {
    BeforeAfter(BeforeAfterDiscriminator<'a>),
    BeforeSameAfter(BeforeSameAfterDiscriminator<'a>),
    CommitSequence(CommitSequenceDiscriminator<'a>),
    Branch(BranchDiscriminator<'a>),
}

impl<'a> Discriminator<'a> {
    /// Construct the discriminator `kind` over `input`.
    ///
    /// # Errors
    /// Returns `TfdError::MissingInput` for the branch-aware discriminator
    /// without branch logs, or a config validation error.
    pub fn new(
        kind: DiscriminatorKind,
        input: AnalysisInput<'a>,
        config: &AnalysisConfig,
    ) -> Result<Self, TfdError> {
        config.validate()?;
        let classifier = SymbolChangeClassifier::new(config.require_reference);
        Ok(match kind {
            DiscriminatorKind::BeforeAfter => {
                Self::BeforeAfter(BeforeAfterDiscriminator::new(input.log, input.graph))
            }
            DiscriminatorKind::BeforeSameAfter => {
                Self::BeforeSameAfter(BeforeSameAfterDiscriminator::new(input.log, input.graph))
            }
            DiscriminatorKind::CommitSequence => Self::CommitSequence(
                CommitSequenceDiscriminator::new(input.log, input.graph)
                    .with_classifier(Box::new(classifier))
                    .with_thresholds(config.threshold, config.thresholds.clone()),
            ),
            DiscriminatorKind::Branch => {
                let branches = input.branches.ok_or_else(|| {
                    TfdError::MissingInput(
                        "the branch discriminator needs per-branch logs".to_string(),
                    )
                })?;
                Self::Branch(BranchDiscriminator::new(
                    branches,
                    input.graph,
                    config.branch_mode,
                    classifier,
                    config.threshold,
                ))
            }
        })
    }

    #[must_use]
    pub fn kind(&self) -> DiscriminatorKind {
        match self {
            Self::BeforeAfter(_) => DiscriminatorKind::BeforeAfter,
            Self::BeforeSameAfter(_) => DiscriminatorKind::BeforeSameAfter,
            Self::CommitSequence(_) => DiscriminatorKind::CommitSequence,
            Self::Branch(_) => DiscriminatorKind::Branch,
        }
    }

    /// Run the classification.
    pub fn statistics(&self) -> Result<Report, TfdError> {
        let report = match self {
            Self::BeforeAfter(d) => Report::BeforeAfter(d.statistics()?),
            Self::BeforeSameAfter(d) => Report::BeforeSameAfter(d.statistics()?),
            Self::CommitSequence(d) => Report::CommitSequence(d.statistics()?),
            Self::Branch(d) => Report::Branch(d.statistics()?),
        };
        let summary = report.summary();
        tracing::info!(
            discriminator = %self.kind(),
            test_first = summary.test_first,
            test_after = summary.test_after,
            untested = summary.untested,
            "classified sources"
        );
        Ok(report)
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// Headline counts of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub test_first: usize,
    pub test_after: usize,
    pub untested: usize,
}

/// The result of a discriminator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    BeforeAfter(BeforeAfterReport),
    BeforeSameAfter(BeforeSameAfterReport),
    CommitSequence(CommitSequenceReport),
    Branch(BranchReport),
}

impl Report {
    /// Human-readable counts.
    #[must_use]
    pub fn output(&self) -> String {
        match self {
            Self::BeforeAfter(r) => r.output(),
            Self::BeforeSameAfter(r) => r.output(),
            Self::CommitSequence(r) => r.output(),
            Self::Branch(r) => r.output(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        match self {
            Self::BeforeAfter(r) => r.summary(),
            Self::BeforeSameAfter(r) => r.summary(),
            Self::CommitSequence(r) => r.summary(),
            Self::Branch(r) => r.summary(),
        }
    }
}

// =============================================================================
// SHARED LOOKUPS
// =============================================================================

/// Every graph artifact must be known to the log.
fn check_snapshot(graph: &BindingGraph, index: &NameIndex) -> Result<(), TfdError> {
    for artifact in graph.sources().iter().chain(graph.tests()) {
        index.require(artifact.path())?;
    }
    Ok(())
}

/// Identity and first commit of an artifact.
fn first_seen(
    log: &TransactionLog,
    index: &NameIndex,
    artifact: &Artifact,
) -> Result<(FileId, usize), TfdError> {
    let id = index.require(artifact.path())?;
    let first = log.first_occurrence(id).ok_or_else(|| {
        TfdError::SnapshotMismatch(format!("'{}' never appears in a commit", artifact))
    })?;
    Ok((id, first))
}

fn paths<'a, I>(artifacts: I) -> std::collections::BTreeSet<String>
where
    I: IntoIterator<Item = &'a Artifact>,
{
    artifacts
        .into_iter()
        .map(|a| a.path().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse() {
        assert_eq!(
            "commit-sequence".parse::<DiscriminatorKind>().ok(),
            Some(DiscriminatorKind::CommitSequence)
        );
        assert_eq!("branch".parse::<DiscriminatorKind>().ok(), Some(DiscriminatorKind::Branch));
        assert!("llm".parse::<DiscriminatorKind>().is_err());
        assert_eq!(
            "commit_sequence".parse::<BranchMode>().ok(),
            Some(BranchMode::CommitSequence)
        );
    }

    #[test]
    fn branch_discriminator_requires_branches() {
        let log = TransactionLog::default();
        let graph = BindingGraph::default();
        let result = Discriminator::new(
            DiscriminatorKind::Branch,
            AnalysisInput::new(&log, &graph),
            &AnalysisConfig::default(),
        );
        assert!(matches!(result, Err(TfdError::MissingInput(_))));
    }

    #[test]
    fn factory_selects_kind() {
        let log = TransactionLog::default();
        let graph = BindingGraph::default();
        for kind in [
            DiscriminatorKind::BeforeAfter,
            DiscriminatorKind::BeforeSameAfter,
            DiscriminatorKind::CommitSequence,
        ] {
            let discriminator =
                Discriminator::new(kind, AnalysisInput::new(&log, &graph), &AnalysisConfig::default())
                    .expect("construct");
            assert_eq!(discriminator.kind(), kind);
            let report = discriminator.statistics().expect("statistics");
            assert_eq!(report.summary().test_first, 0);
        }
    }
}
