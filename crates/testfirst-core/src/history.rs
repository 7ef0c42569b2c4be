//! # History
//!
//! Raw history rows → aligned, identity-stable transaction log.
//!
//! Also derives one scoped log per merged side branch, consumed by the
//! branch-aware discriminator.

use crate::align::{Branch, CommitAligner};
use crate::registry::TransactionBuilder;
use crate::transaction::TransactionLog;
use crate::types::{CommitRecord, RawRecord, TfdError};
use std::collections::BTreeMap;

/// Group raw rows into commit records.
///
/// Commits keep the order in which their hash first appears. Parents are
/// taken from the first row of each commit.
pub fn group_records(records: &[RawRecord]) -> Result<Vec<CommitRecord>, TfdError> {
    let mut commits: Vec<CommitRecord> = Vec::new();
    let mut position: BTreeMap<&str, usize> = BTreeMap::new();

    for record in records {
        let hash = record.hash.trim();
        if hash.is_empty() {
            return Err(TfdError::InvalidRecord(
                "history row without a commit hash".to_string(),
            ));
        }

        let slot = match position.get(hash) {
            Some(&slot) => slot,
            None => {
                position.insert(hash, commits.len());
                commits.push(CommitRecord::new(hash, record.parent_hashes()));
                commits.len() - 1
            }
        };

        if let Some(change) = record.to_change()? {
            commits[slot].changes.push(change);
        }
    }

    Ok(commits)
}

/// A merged side branch with its own scoped transaction log.
#[derive(Debug, Clone)]
pub struct BranchHistory {
    pub branch: Branch,
    pub log: TransactionLog,
}

/// The linearized history of one project.
#[derive(Debug, Clone, Default)]
pub struct History {
    log: TransactionLog,
    branches: Vec<BranchHistory>,
}

impl History {
    /// Align `records` and build the transaction log.
    ///
    /// An empty record set yields an empty history.
    pub fn from_records(records: Vec<CommitRecord>) -> Result<Self, TfdError> {
        if records.is_empty() {
            return Ok(Self::default());
        }

        let aligner = CommitAligner::new(records)?;
        let log = build_log(&aligner.align()?)?;

        let mut branches = Vec::new();
        for branch in aligner.merged_branches() {
            let mut builder = TransactionBuilder::new();
            for hash in &branch.commits {
                if let Some(record) = aligner.record(hash) {
                    builder.process_commit(record)?;
                }
            }
            branches.push(BranchHistory {
                branch,
                log: builder.build(),
            });
        }

        tracing::info!(
            commits = log.len(),
            files = log.file_count(),
            branches = branches.len(),
            "built transaction log"
        );

        Ok(Self { log, branches })
    }

    /// Build the log without aligning: records are taken in the given order.
    pub fn from_linear(records: &[CommitRecord]) -> Result<Self, TfdError> {
        Ok(Self {
            log: build_log(records)?,
            branches: Vec::new(),
        })
    }

    /// Group raw rows, align, and build.
    pub fn from_raw(records: &[RawRecord]) -> Result<Self, TfdError> {
        Self::from_records(group_records(records)?)
    }

    #[must_use]
    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    #[must_use]
    pub fn branches(&self) -> &[BranchHistory] {
        &self.branches
    }

    #[must_use]
    pub fn into_log(self) -> TransactionLog {
        self.log
    }
}

fn build_log(records: &[CommitRecord]) -> Result<TransactionLog, TfdError> {
    let mut builder = TransactionBuilder::new();
    for record in records {
        builder.process_commit(record)?;
    }
    Ok(builder.build())
}

// =============================================================================
// TESTS
// =============================================================================
