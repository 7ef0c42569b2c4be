//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the mining pipeline:
//! - File identities (`FileId`)
//! - Raw history input (`RawRecord`, `RawChange`, `CommitRecord`)
//! - Linearized history output (`ChangeEvent`, `Commit`)
//! - Error types (`TfdError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer identifiers only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`/`BTreeSet`
//! - Keep symbol sets in `BTreeSet` so serialization order is stable

use crate::primitives::FIELD_DELIMITER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// FILE IDENTITY
// =============================================================================

/// Stable numeric identity of a file across renames and copies.
///
/// Identities are minted in increasing order and never reused, even after
/// the file they name is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

impl FileId {
    /// Get the raw identity value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// MODIFICATION KIND
// =============================================================================

/// The kind of change a commit applied to a file.
///
/// Serialized as the single-letter code used by the history extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModificationKind {
    #[serde(rename = "A")]
    Add,
    #[serde(rename = "C")]
    Copy,
    #[serde(rename = "D")]
    Delete,
    #[serde(rename = "M")]
    Modify,
    #[serde(rename = "R")]
    Rename,
    /// Permission-only or otherwise content-free change.
    #[serde(rename = "U")]
    Unknown,
}

impl ModificationKind {
    /// Parse a single-letter modification code.
    ///
    /// Returns `None` for codes outside `A/C/D/M/R/U`; callers drop such rows.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "A" => Some(Self::Add),
            "C" => Some(Self::Copy),
            "D" => Some(Self::Delete),
            "M" => Some(Self::Modify),
            "R" => Some(Self::Rename),
            "U" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// The single-letter code for this kind.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Add => 'A',
            Self::Copy => 'C',
            Self::Delete => 'D',
            Self::Modify => 'M',
            Self::Rename => 'R',
            Self::Unknown => 'U',
        }
    }

    /// Whether this change brings a file into existence.
    #[must_use]
    pub const fn is_creation(self) -> bool {
        matches!(self, Self::Add | Self::Copy)
    }
}

impl fmt::Display for ModificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// =============================================================================
// RAW INPUT
// =============================================================================

/// One row of extracted history, exactly as the extractor writes it.
///
/// Multi-valued fields are joined with [`FIELD_DELIMITER`]. A row with an
/// empty `file` and `modification_type` records a commit that touched no
/// files; it still takes part in the commit topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RawRecord {
    pub hash: String,
    #[serde(default)]
    pub parents: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub modification_type: String,
    #[serde(default)]
    pub new_methods: String,
    #[serde(default)]
    pub classes_used: String,
}

impl RawRecord {
    /// Parent hashes in declared order (first parent first).
    #[must_use]
    pub fn parent_hashes(&self) -> Vec<String> {
        split_field(&self.parents).collect()
    }

    /// Convert this row into a file change.
    ///
    /// Returns `Ok(None)` for placeholder rows and for unrecognized
    /// modification codes.
    pub fn to_change(&self) -> Result<Option<RawChange>, TfdError> {
        let file = self.file.trim();
        let code = self.modification_type.trim();

        if file.is_empty() && code.is_empty() {
            return Ok(None);
        }
        if self.hash.trim().is_empty() {
            return Err(TfdError::InvalidRecord(format!(
                "row for '{}' has no commit hash",
                file
            )));
        }

        let Some(kind) = ModificationKind::from_code(code) else {
            tracing::debug!(hash = %self.hash, file, code, "dropping unrecognized modification kind");
            return Ok(None);
        };

        if file.is_empty() {
            return Err(TfdError::InvalidRecord(format!(
                "commit {} has a '{}' change without a path",
                self.hash, code
            )));
        }

        let change = match kind {
            ModificationKind::Rename => {
                let Some((old, new)) = file.split_once(FIELD_DELIMITER) else {
                    return Err(TfdError::InvalidRecord(format!(
                        "commit {} renames '{}' without an old{}new pair",
                        self.hash, file, FIELD_DELIMITER
                    )));
                };
                RawChange::rename(old.trim(), new.trim())
            }
            // Copies may carry the source path; identity follows the new path.
            ModificationKind::Copy => {
                let target = file
                    .rsplit_once(FIELD_DELIMITER)
                    .map_or(file, |(_, new)| new.trim());
                RawChange::new(kind, target)
            }
            _ => RawChange::new(kind, file),
        };

        Ok(Some(
            change
                .with_new_symbols(split_field(&self.new_methods))
                .with_references(split_field(&self.classes_used)),
        ))
    }
}

/// Split a delimiter-joined field, skipping empty entries.
pub(crate) fn split_field(field: &str) -> impl Iterator<Item = String> + '_ {
    field
        .split(FIELD_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A single file change before identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChange {
    pub kind: ModificationKind,
    /// The path after the change (the new path for renames).
    pub path: String,
    /// The path before a rename.
    pub old_path: Option<String>,
    /// Symbols this change newly defines.
    pub new_symbols: BTreeSet<String>,
    /// Symbols this change references.
    pub referenced_symbols: BTreeSet<String>,
}

impl RawChange {
    /// Create a change of the given kind on a path.
    #[must_use]
    pub fn new(kind: ModificationKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
            new_symbols: BTreeSet::new(),
            referenced_symbols: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn add(path: impl Into<String>) -> Self {
        Self::new(ModificationKind::Add, path)
    }

    #[must_use]
    pub fn copy(path: impl Into<String>) -> Self {
        Self::new(ModificationKind::Copy, path)
    }

    #[must_use]
    pub fn modify(path: impl Into<String>) -> Self {
        Self::new(ModificationKind::Modify, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(ModificationKind::Delete, path)
    }

    #[must_use]
    pub fn unknown(path: impl Into<String>) -> Self {
        Self::new(ModificationKind::Unknown, path)
    }

    /// Rename `old` to `new`.
    #[must_use]
    pub fn rename(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old_path: Some(old.into()),
            ..Self::new(ModificationKind::Rename, new)
        }
    }

    /// Attach newly defined symbols.
    #[must_use]
    pub fn with_new_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.new_symbols.extend(symbols.into_iter().map(Into::into));
        self
    }

    /// Attach referenced symbols.
    #[must_use]
    pub fn with_references<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.referenced_symbols
            .extend(symbols.into_iter().map(Into::into));
        self
    }
}

/// All changes of one commit, with its position in the commit DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    /// Parent hashes, first parent first.
    pub parents: Vec<String>,
    pub changes: Vec<RawChange>,
}

impl CommitRecord {
    /// Create a commit record without changes.
    #[must_use]
    pub fn new<I, S>(hash: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hash: hash.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            changes: Vec::new(),
        }
    }

    /// Append a change.
    #[must_use]
    pub fn with_change(mut self, change: RawChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Whether this commit merges two or more lines of history.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

// =============================================================================
// LINEARIZED HISTORY
// =============================================================================

/// A change after identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub file: FileId,
    pub kind: ModificationKind,
    #[serde(default)]
    pub new_symbols: BTreeSet<String>,
    #[serde(default)]
    pub referenced_symbols: BTreeSet<String>,
}

impl ChangeEvent {
    /// Create an event without symbol information.
    #[must_use]
    pub fn new(file: FileId, kind: ModificationKind) -> Self {
        Self {
            file,
            kind,
            new_symbols: BTreeSet::new(),
            referenced_symbols: BTreeSet::new(),
        }
    }
}

/// A commit of the linearized history.
///
/// `number` is the position in the filtered sequence: commits that resolved
/// to no events are not numbered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub number: usize,
    pub hash: String,
    #[serde(default)]
    pub parents: Vec<String>,
    pub changes: Vec<ChangeEvent>,
}

impl Commit {
    /// The first event of this commit on `file`, if any.
    #[must_use]
    pub fn change_for(&self, file: FileId) -> Option<&ChangeEvent> {
        self.changes.iter().find(|event| event.file == file)
    }

    /// Whether this commit touches `file`.
    #[must_use]
    pub fn touches(&self, file: FileId) -> bool {
        self.change_for(file).is_some()
    }

    /// Identities touched by this commit, in event order.
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.changes.iter().map(|event| event.file)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the mining pipeline.
///
/// - History noise is healed, never reported here
/// - Every variant aborts the run; callers restart from raw inputs
#[derive(Debug, Error)]
pub enum TfdError {
    /// A raw history row cannot be interpreted.
    #[error("Invalid history record: {0}")]
    InvalidRecord(String),

    /// The commit DAG is not a single-root, single-tip acyclic history.
    #[error("Malformed commit topology: {0}")]
    MalformedTopology(String),

    /// Two identities claim the same live path.
    #[error("Identity conflict on '{path}': held by {held_by}, claimed by {claimed_by}")]
    IdentityConflict {
        path: String,
        held_by: FileId,
        claimed_by: FileId,
    },

    /// The binding graph and the transaction log disagree.
    #[error("Snapshot does not match history: {0}")]
    SnapshotMismatch(String),

    /// A binding graph link refers to an artifact outside its sets.
    #[error("Invalid binding graph: {0}")]
    InvalidGraph(String),

    /// A leniency threshold could not be parsed or is out of range.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    /// A discriminator was run without input it depends on.
    #[error("Missing analysis input: {0}")]
    MissingInput(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
