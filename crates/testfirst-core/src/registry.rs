//! # File Identity Registry
//!
//! Assigns stable numeric identities to files and turns raw changes into a
//! linearized, identity-stable transaction log.
//!
//! The registry tolerates the noise alignment introduces into history:
//! - Duplicate adds degrade to modifications
//! - Deletes of unknown paths are dropped
//! - Modifications and renames of unknown paths synthesize the missing add
//!
//! The only fatal contradiction is two identities claiming one live path.

use crate::transaction::TransactionLog;
use crate::types::{
    ChangeEvent, Commit, CommitRecord, FileId, ModificationKind, RawChange, TfdError,
};
use std::collections::BTreeMap;

// =============================================================================
// IDENTITY REGISTRY
// =============================================================================

/// Path ↔ identity bookkeeping.
///
/// `live` maps each currently existing path to its identity. `names` keeps
/// every path an identity has ever had, oldest first.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    next_id: u64,
    live: BTreeMap<String, FileId>,
    names: BTreeMap<FileId, Vec<String>>,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    /// Create an empty registry. The first minted identity is `#1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            live: BTreeMap::new(),
            names: BTreeMap::new(),
        }
    }

    /// Identity currently holding `path`, if any.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<FileId> {
        self.live.get(path).copied()
    }

    /// All live paths with their identities.
    pub fn live_paths(&self) -> impl Iterator<Item = (&str, FileId)> {
        self.live.iter().map(|(path, id)| (path.as_str(), *id))
    }

    /// Path history of an identity, oldest first.
    #[must_use]
    pub fn names_of(&self, id: FileId) -> Option<&[String]> {
        self.names.get(&id).map(Vec::as_slice)
    }

    /// Number of identities minted so far.
    #[must_use]
    pub fn identity_count(&self) -> usize {
        self.names.len()
    }

    /// Consume the registry, returning the identity → path history map.
    #[must_use]
    pub fn into_names(self) -> BTreeMap<FileId, Vec<String>> {
        self.names
    }

    fn mint(&mut self, path: &str) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        self.live.insert(path.to_string(), id);
        self.names.insert(id, vec![path.to_string()]);
        id
    }

    /// Apply one raw change.
    ///
    /// Returns the identity and the effective modification kind, or `None`
    /// when the change produces no event.
    pub fn apply(
        &mut self,
        change: &RawChange,
    ) -> Result<Option<(FileId, ModificationKind)>, TfdError> {
        let path = change.path.as_str();

        match change.kind {
            ModificationKind::Add | ModificationKind::Copy => {
                if let Some(id) = self.lookup(path) {
                    tracing::debug!(path, %id, "duplicate add degraded to modify");
                    Ok(Some((id, ModificationKind::Modify)))
                } else {
                    Ok(Some((self.mint(path), change.kind)))
                }
            }
            ModificationKind::Delete => match self.live.remove(path) {
                Some(id) => Ok(Some((id, ModificationKind::Delete))),
                None => {
                    tracing::debug!(path, "dropping delete of unknown path");
                    Ok(None)
                }
            },
            ModificationKind::Modify => Ok(Some(self.modify(path))),
            ModificationKind::Rename => match change.old_path.as_deref() {
                Some(old) if old != path => self.rename(old, path).map(Some),
                _ => Ok(Some(self.modify(path))),
            },
            ModificationKind::Unknown => Ok(None),
        }
    }

    fn modify(&mut self, path: &str) -> (FileId, ModificationKind) {
        match self.lookup(path) {
            Some(id) => (id, ModificationKind::Modify),
            None => {
                tracing::debug!(path, "modify of unknown path synthesized as add");
                (self.mint(path), ModificationKind::Add)
            }
        }
    }

    fn rename(&mut self, old: &str, new: &str) -> Result<(FileId, ModificationKind), TfdError> {
        let existing = self.lookup(old);

        if let Some(held_by) = self.lookup(new) {
            // An unknown old path would have received the next identity.
            let claimed_by = existing.unwrap_or(FileId(self.next_id));
            return Err(TfdError::IdentityConflict {
                path: new.to_string(),
                held_by,
                claimed_by,
            });
        }

        let (id, kind) = match existing {
            Some(id) => (id, ModificationKind::Rename),
            None => {
                tracing::debug!(old, new, "rename of unknown path synthesized as add");
                (self.mint(old), ModificationKind::Add)
            }
        };

        self.live.remove(old);
        self.live.insert(new.to_string(), id);
        if let Some(history) = self.names.get_mut(&id) {
            history.push(new.to_string());
        }
        Ok((id, kind))
    }
}

// =============================================================================
// TRANSACTION BUILDER
// =============================================================================

#[derive(Debug, Clone)]
struct PendingCommit {
    hash: String,
    parents: Vec<String>,
    changes: Vec<ChangeEvent>,
}

/// Builds a [`TransactionLog`] from changes fed in linear commit order.
///
/// Feed each commit with [`begin_commit`](Self::begin_commit) followed by
/// [`process`](Self::process) calls, or hand over whole records with
/// [`process_commit`](Self::process_commit).
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    registry: IdentityRegistry,
    commits: Vec<Commit>,
    pending: Option<PendingCommit>,
}

impl TransactionBuilder {
    /// Create a builder with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity registry as built so far.
    #[must_use]
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Close the current commit and open a new one.
    pub fn begin_commit(&mut self, hash: impl Into<String>, parents: Vec<String>) {
        self.flush();
        self.pending = Some(PendingCommit {
            hash: hash.into(),
            parents,
            changes: Vec::new(),
        });
    }

    /// Resolve one change into an event of the open commit.
    ///
    /// Opens an anonymous commit if none is open.
    pub fn process(&mut self, change: &RawChange) -> Result<Option<ChangeEvent>, TfdError> {
        let Some((file, kind)) = self.registry.apply(change)? else {
            return Ok(None);
        };

        let event = ChangeEvent {
            file,
            kind,
            new_symbols: change.new_symbols.clone(),
            referenced_symbols: change.referenced_symbols.clone(),
        };

        self.pending
            .get_or_insert_with(|| PendingCommit {
                hash: String::new(),
                parents: Vec::new(),
                changes: Vec::new(),
            })
            .changes
            .push(event.clone());

        Ok(Some(event))
    }

    /// Process every change of a commit record.
    ///
    /// Returns the number the commit received, or `None` if it produced no
    /// events and was dropped.
    pub fn process_commit(&mut self, record: &CommitRecord) -> Result<Option<usize>, TfdError> {
        self.begin_commit(record.hash.clone(), record.parents.clone());
        for change in &record.changes {
            self.process(change)?;
        }
        let before = self.commits.len();
        self.flush();
        Ok((self.commits.len() > before).then_some(before))
    }

    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            if pending.changes.is_empty() {
                tracing::debug!(hash = %pending.hash, "dropping commit without events");
                return;
            }
            self.commits.push(Commit {
                number: self.commits.len(),
                hash: pending.hash,
                parents: pending.parents,
                changes: pending.changes,
            });
        }
    }

    /// Finish building and return the log.
    #[must_use]
    pub fn build(mut self) -> TransactionLog {
        self.flush();
        TransactionLog::new(self.commits, self.registry.into_names())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_mints_increasing_ids() {
        let mut registry = IdentityRegistry::new();
        let a = registry.apply(&RawChange::add("A.java")).expect("apply");
        let b = registry.apply(&RawChange::add("B.java")).expect("apply");
        assert_eq!(a, Some((FileId(1), ModificationKind::Add)));
        assert_eq!(b, Some((FileId(2), ModificationKind::Add)));
    }

    #[test]
    fn duplicate_add_degrades_to_modify() {
        let mut registry = IdentityRegistry::new();
        registry.apply(&RawChange::add("A.java")).expect("apply");
        let again = registry.apply(&RawChange::copy("A.java")).expect("apply");
        assert_eq!(again, Some((FileId(1), ModificationKind::Modify)));
        assert_eq!(registry.identity_count(), 1);
    }

    #[test]
    fn delete_of_unknown_path_is_dropped() {
        let mut registry = IdentityRegistry::new();
        let result = registry.apply(&RawChange::delete("Ghost.java")).expect("apply");
        assert!(result.is_none());
    }

    #[test]
    fn modify_of_unknown_path_synthesizes_add() {
        let mut registry = IdentityRegistry::new();
        let result = registry.apply(&RawChange::modify("A.java")).expect("apply");
        assert_eq!(result, Some((FileId(1), ModificationKind::Add)));
        assert_eq!(registry.lookup("A.java"), Some(FileId(1)));
    }

    #[test]
    fn rename_transfers_identity() {
        let mut registry = IdentityRegistry::new();
        registry.apply(&RawChange::add("Old.java")).expect("apply");
        let result = registry
            .apply(&RawChange::rename("Old.java", "New.java"))
            .expect("apply");
        assert_eq!(result, Some((FileId(1), ModificationKind::Rename)));
        assert_eq!(registry.lookup("Old.java"), None);
        assert_eq!(registry.lookup("New.java"), Some(FileId(1)));
        assert_eq!(
            registry.names_of(FileId(1)),
            Some(&["Old.java".to_string(), "New.java".to_string()][..])
        );
    }

    #[test]
    fn rename_of_unknown_path_synthesizes_add() {
        let mut registry = IdentityRegistry::new();
        let result = registry
            .apply(&RawChange::rename("Old.java", "New.java"))
            .expect("apply");
        assert_eq!(result, Some((FileId(1), ModificationKind::Add)));
        assert_eq!(registry.lookup("New.java"), Some(FileId(1)));
        assert_eq!(registry.names_of(FileId(1)).map(<[String]>::len), Some(2));
    }

    #[test]
    fn rename_onto_live_path_conflicts() {
        let mut registry = IdentityRegistry::new();
        registry.apply(&RawChange::add("A.java")).expect("apply");
        registry.apply(&RawChange::add("B.java")).expect("apply");
        let result = registry.apply(&RawChange::rename("A.java", "B.java"));
        assert!(matches!(
            result,
            Err(TfdError::IdentityConflict {
                held_by: FileId(2),
                claimed_by: FileId(1),
                ..
            })
        ));
        // Registry left untouched
        assert_eq!(registry.lookup("A.java"), Some(FileId(1)));
    }

    #[test]
    fn rename_to_same_path_is_modify() {
        let mut registry = IdentityRegistry::new();
        registry.apply(&RawChange::add("A.java")).expect("apply");
        let result = registry
            .apply(&RawChange::rename("A.java", "A.java"))
            .expect("apply");
        assert_eq!(result, Some((FileId(1), ModificationKind::Modify)));
    }

    #[test]
    fn unknown_change_produces_nothing() {
        let mut registry = IdentityRegistry::new();
        registry.apply(&RawChange::add("A.java")).expect("apply");
        let result = registry.apply(&RawChange::unknown("A.java")).expect("apply");
        assert!(result.is_none());
    }

    #[test]
    fn ids_are_never_reused_after_delete() {
        let mut registry = IdentityRegistry::new();
        registry.apply(&RawChange::add("A.java")).expect("apply");
        registry.apply(&RawChange::delete("A.java")).expect("apply");
        let again = registry.apply(&RawChange::add("A.java")).expect("apply");
        assert_eq!(again, Some((FileId(2), ModificationKind::Add)));
    }

    #[test]
    fn builder_drops_empty_commits() {
        let mut builder = TransactionBuilder::new();
        let first =
            CommitRecord::new("c0", Vec::<String>::new()).with_change(RawChange::add("A.java"));
        let empty =
            CommitRecord::new("c1", ["c0"]).with_change(RawChange::delete("Ghost.java"));
        let last = CommitRecord::new("c2", ["c1"]).with_change(RawChange::modify("A.java"));

        assert_eq!(builder.process_commit(&first).expect("process"), Some(0));
        assert_eq!(builder.process_commit(&empty).expect("process"), None);
        assert_eq!(builder.process_commit(&last).expect("process"), Some(1));

        let log = builder.build();
        assert_eq!(log.len(), 2);
        assert_eq!(log.commits()[1].hash, "c2");
        assert_eq!(log.commits()[1].number, 1);
    }

    #[test]
    fn builder_opens_implicit_commit() {
        let mut builder = TransactionBuilder::new();
        let event = builder
            .process(&RawChange::add("A.java").with_new_symbols(["run"]))
            .expect("process")
            .expect("event");
        assert!(event.new_symbols.contains("run"));

        let log = builder.build();
        assert_eq!(log.len(), 1);
        assert!(log.commits()[0].hash.is_empty());
    }
}
