//! # Transaction Log
//!
//! The linearized, identity-stable encoding of history.
//!
//! A `TransactionLog` is built once per run by the
//! [`TransactionBuilder`](crate::registry::TransactionBuilder) and is
//! read-only thereafter. Discriminators consume it; pattern miners consume
//! its serialized form.

use crate::types::{Commit, FileId, ModificationKind, TfdError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Ordered commits plus the identity → path history map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    commits: Vec<Commit>,
    id_to_names: BTreeMap<FileId, Vec<String>>,
}

impl TransactionLog {
    /// Assemble a log from its parts.
    ///
    /// No validation is performed; see [`validate`](Self::validate).
    #[must_use]
    pub fn new(commits: Vec<Commit>, id_to_names: BTreeMap<FileId, Vec<String>>) -> Self {
        Self {
            commits,
            id_to_names,
        }
    }

    /// Commits in linear order.
    #[must_use]
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Identity → path history map.
    #[must_use]
    pub fn id_to_names(&self) -> &BTreeMap<FileId, Vec<String>> {
        &self.id_to_names
    }

    /// Path history of an identity, oldest first.
    #[must_use]
    pub fn names_of(&self, id: FileId) -> Option<&[String]> {
        self.id_to_names.get(&id).map(Vec::as_slice)
    }

    /// The most recent path of an identity.
    #[must_use]
    pub fn latest_name(&self, id: FileId) -> Option<&str> {
        self.names_of(id)
            .and_then(|names| names.last())
            .map(String::as_str)
    }

    /// Number of commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether the log holds no commits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Number of identities known to the log.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.id_to_names.len()
    }

    /// Commit by number.
    #[must_use]
    pub fn commit(&self, number: usize) -> Option<&Commit> {
        self.commits.get(number)
    }

    /// Position of the earliest commit touching `id`.
    ///
    /// Equal to that commit's number in a valid log.
    #[must_use]
    pub fn first_occurrence(&self, id: FileId) -> Option<usize> {
        self.commits.iter().position(|commit| commit.touches(id))
    }

    /// Build the path → identity index.
    ///
    /// Every historical path resolves. A path that several identities held
    /// resolves, in order of preference, to the identity living there at
    /// the end of the log, to the newest identity whose latest path it is,
    /// then to the newest identity that ever held it.
    #[must_use]
    pub fn name_index(&self) -> NameIndex {
        let mut last_kind = BTreeMap::new();
        for commit in &self.commits {
            for event in &commit.changes {
                last_kind.insert(event.file, event.kind);
            }
        }
        let live = |id: &FileId| last_kind.get(id) != Some(&ModificationKind::Delete);

        let mut by_name = BTreeMap::new();
        for (id, names) in &self.id_to_names {
            for name in names {
                by_name.insert(name.clone(), *id);
            }
        }
        for (id, names) in &self.id_to_names {
            if let Some(name) = names.last() {
                by_name.insert(name.clone(), *id);
            }
        }
        for (id, names) in self.id_to_names.iter().filter(|(id, _)| live(id)) {
            if let Some(name) = names.last() {
                by_name.insert(name.clone(), *id);
            }
        }
        NameIndex { by_name }
    }

    /// Keep only identities whose latest path passes `keep`.
    ///
    /// Commits left without events are dropped and the remainder renumbered.
    #[must_use]
    pub fn filter_on<F>(&self, keep: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let id_to_names: BTreeMap<FileId, Vec<String>> = self
            .id_to_names
            .iter()
            .filter(|(_, names)| names.last().is_some_and(|name| keep(name)))
            .map(|(id, names)| (*id, names.clone()))
            .collect();

        let mut commits = Vec::new();
        for commit in &self.commits {
            let changes: Vec<_> = commit
                .changes
                .iter()
                .filter(|event| id_to_names.contains_key(&event.file))
                .cloned()
                .collect();
            if changes.is_empty() {
                continue;
            }
            commits.push(Commit {
                number: commits.len(),
                hash: commit.hash.clone(),
                parents: commit.parents.clone(),
                changes,
            });
        }

        Self {
            commits,
            id_to_names,
        }
    }

    /// Check the structural invariants of the log.
    ///
    /// - Commit numbers equal their positions
    /// - Every referenced identity is registered
    /// - Identities first appear in strictly increasing order
    pub fn validate(&self) -> Result<(), TfdError> {
        let mut seen = BTreeSet::new();
        let mut last_new: Option<FileId> = None;

        for (position, commit) in self.commits.iter().enumerate() {
            if commit.number != position {
                return Err(TfdError::SerializationError(format!(
                    "commit {} is numbered {} at position {}",
                    commit.hash, commit.number, position
                )));
            }
            for id in commit.file_ids() {
                if !self.id_to_names.contains_key(&id) {
                    return Err(TfdError::SerializationError(format!(
                        "commit {} references unregistered identity {}",
                        commit.hash, id
                    )));
                }
                if seen.insert(id) {
                    if last_new.is_some_and(|last| id <= last) {
                        return Err(TfdError::SerializationError(format!(
                            "identity {} first appears after a newer identity",
                            id
                        )));
                    }
                    last_new = Some(id);
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// NAME INDEX
// =============================================================================

/// Path → identity lookup, built once per analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIndex {
    by_name: BTreeMap<String, FileId>,
}

impl NameIndex {
    /// Identity of a path, if the history ever knew it.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<FileId> {
        self.by_name.get(path).copied()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.by_name.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolve a path that must be known to the history.
    ///
    /// # Errors
    /// Returns `TfdError::SnapshotMismatch` when the path is unknown.
    pub fn require(&self, path: &str) -> Result<FileId, TfdError> {
        self.resolve(path).ok_or_else(|| {
            TfdError::SnapshotMismatch(format!("'{}' is not in the transaction log", path))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TransactionBuilder;
    use crate::types::{ChangeEvent, CommitRecord, RawChange};

    fn sample_log() -> TransactionLog {
        let mut builder = TransactionBuilder::new();
        let records = [
            CommitRecord::new("c0", Vec::<String>::new())
                .with_change(RawChange::add("src/A.java"))
                .with_change(RawChange::add("README.md")),
            CommitRecord::new("c1", ["c0"]).with_change(RawChange::modify("README.md")),
            CommitRecord::new("c2", ["c1"])
                .with_change(RawChange::rename("src/A.java", "src/B.java")),
            CommitRecord::new("c3", ["c2"]).with_change(RawChange::delete("src/B.java")),
            CommitRecord::new("c4", ["c3"]).with_change(RawChange::add("src/A.java")),
        ];
        for record in &records {
            builder.process_commit(record).expect("process");
        }
        builder.build()
    }

    #[test]
    fn first_occurrence_finds_earliest_commit() {
        let log = sample_log();
        assert_eq!(log.first_occurrence(FileId(1)), Some(0));
        assert_eq!(log.first_occurrence(FileId(3)), Some(4));
        assert_eq!(log.first_occurrence(FileId(9)), None);
    }

    #[test]
    fn name_index_resolves_history() {
        let log = sample_log();
        let index = log.name_index();
        assert_eq!(index.resolve("src/B.java"), Some(FileId(1)));
        // Reused path maps to the identity living there
        assert_eq!(index.resolve("src/A.java"), Some(FileId(3)));
        assert!(matches!(
            index.require("src/C.java"),
            Err(TfdError::SnapshotMismatch(_))
        ));
    }

    #[test]
    fn name_index_prefers_current_holder() {
        let mut builder = TransactionBuilder::new();
        let records = [
            CommitRecord::new("c0", Vec::<String>::new())
                .with_change(RawChange::add("Q.java"))
                .with_change(RawChange::add("P.java")),
            CommitRecord::new("c1", ["c0"]).with_change(RawChange::rename("P.java", "R.java")),
            CommitRecord::new("c2", ["c1"]).with_change(RawChange::rename("Q.java", "P.java")),
        ];
        for record in &records {
            builder.process_commit(record).expect("process");
        }
        let log = builder.build();

        // The newer identity left P.java before the older one moved in.
        let index = log.name_index();
        assert_eq!(index.resolve("P.java"), Some(FileId(1)));
        assert_eq!(index.resolve("R.java"), Some(FileId(2)));
        assert_eq!(index.resolve("Q.java"), Some(FileId(1)));
    }

    #[test]
    fn name_index_prefers_live_identity_over_deleted_one() {
        let log = TransactionLog::new(
            vec![
                Commit {
                    number: 0,
                    hash: "c0".to_string(),
                    parents: Vec::new(),
                    changes: vec![ChangeEvent::new(FileId(1), ModificationKind::Add)],
                },
                Commit {
                    number: 1,
                    hash: "c1".to_string(),
                    parents: vec!["c0".to_string()],
                    changes: vec![
                        ChangeEvent::new(FileId(2), ModificationKind::Add),
                        ChangeEvent::new(FileId(2), ModificationKind::Delete),
                    ],
                },
            ],
            BTreeMap::from([
                (FileId(1), vec!["P.java".to_string()]),
                (FileId(2), vec!["P.java".to_string()]),
            ]),
        );
        assert_eq!(log.name_index().resolve("P.java"), Some(FileId(1)));
    }

    #[test]
    fn filter_renumbers_commits() {
        let log = sample_log();
        let java = log.filter_on(|name| name.ends_with(".java"));
        assert_eq!(java.file_count(), 2);
        // c1 only touched README.md
        assert_eq!(java.len(), 4);
        let numbers: Vec<_> = java.commits().iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
        assert_eq!(java.commits()[1].hash, "c2");
        assert!(java.validate().is_ok());
    }

    #[test]
    fn latest_name_follows_renames() {
        let log = sample_log();
        assert_eq!(log.latest_name(FileId(1)), Some("src/B.java"));
    }

    #[test]
    fn validate_rejects_unregistered_identity() {
        let mut log = sample_log();
        log.id_to_names.remove(&FileId(2));
        assert!(log.validate().is_err());
    }

    #[test]
    fn json_roundtrip_is_lossless() {
        let log = sample_log();
        let json = serde_json::to_string(&log).expect("serialize");
        let back: TransactionLog = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(log, back);
    }
}
