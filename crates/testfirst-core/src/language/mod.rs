//! # Language Plugins
//!
//! Everything the pipeline knows about a programming language lives behind
//! the [`Language`] trait:
//! - Partitioning files into tests and sources
//! - Canonical module names and reference statements (binding)
//! - Test naming conventions (name binding)
//! - Defined and used symbols (substantial-change detection)
//!
//! Implementations are stateless and selected through [`LanguageKind`].
//! History rows that arrive without symbol columns are filled in by
//! [`annotate_commits`] from file revisions behind a [`RevisionReader`].

mod java;
mod python;

pub use java::Java;
pub use python::Python;

use crate::binding::{Artifact, LineReader};
use crate::types::{CommitRecord, ModificationKind, RawChange, TfdError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Per-language parsing heuristics.
pub trait Language: Send + Sync {
    /// Which language this is.
    fn kind(&self) -> LanguageKind;

    /// File suffix, including the dot.
    fn suffix(&self) -> &'static str;

    /// Whether `artifact` is a test file.
    fn is_test(&self, artifact: &Artifact, reader: &dyn LineReader) -> Result<bool, TfdError>;

    /// Canonical name other files use to reference `artifact`.
    fn module_name(&self, artifact: &Artifact, lines: &[String]) -> Option<String>;

    /// Module names referenced by reference statements in `lines`.
    fn references(&self, lines: &[String]) -> BTreeSet<String>;

    /// Stem of the source a test stem names, after stripping the naming
    /// convention. `None` if the stem follows no convention.
    fn test_subject(&self, stem: &str) -> Option<String>;

    /// Name of the method or function defined on `line`, if any.
    fn defined_symbol(&self, line: &str) -> Option<String>;

    /// Types or modules used by `lines`.
    fn used_symbols(&self, lines: &[String]) -> BTreeSet<String>;

    /// Symbols defined in `after` but not in `before`.
    fn new_symbols(&self, before: &[String], after: &[String]) -> BTreeSet<String> {
        let existing: BTreeSet<String> = before
            .iter()
            .filter_map(|line| self.defined_symbol(line))
            .collect();
        after
            .iter()
            .filter_map(|line| self.defined_symbol(line))
            .filter(|symbol| !existing.contains(symbol))
            .collect()
    }
}

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LanguageKind {
    #[default]
    Java,
    Python,
}

impl LanguageKind {
    /// The plugin for this language.
    #[must_use]
    pub fn plugin(self) -> &'static dyn Language {
        static JAVA: Java = Java;
        static PYTHON: Python = Python;
        match self {
            Self::Java => &JAVA,
            Self::Python => &PYTHON,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Python => "python",
        }
    }
}

impl fmt::Display for LanguageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageKind {
    type Err = TfdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" => Ok(Self::Java),
            "python" | "py" => Ok(Self::Python),
            other => Err(TfdError::InvalidRecord(format!(
                "unsupported language '{}'",
                other
            ))),
        }
    }
}

/// Fill a change's symbol sets from file contents before and after it.
///
/// New symbols are those defined only after the change; referenced symbols
/// are those used by lines the change added.
#[must_use]
pub fn annotate(
    language: &dyn Language,
    change: RawChange,
    before: &[String],
    after: &[String],
) -> RawChange {
    let previous: BTreeSet<&str> = before.iter().map(String::as_str).collect();
    let added: Vec<String> = after
        .iter()
        .filter(|line| !previous.contains(line.as_str()))
        .cloned()
        .collect();

    let new_symbols = language.new_symbols(before, after);
    let references = language.used_symbols(&added);
    change.with_new_symbols(new_symbols).with_references(references)
}

/// Capability to read a file as it was at a given commit.
pub trait RevisionReader: Send + Sync {
    /// Lines of `path` at commit `hash`, or `None` if the commit does not
    /// hold that path.
    fn read_at(&self, hash: &str, path: &str) -> Result<Option<Vec<String>>, TfdError>;
}

/// Fill symbol sets of changes that carry none, comparing each file with
/// its first-parent revision.
///
/// Only files with the language's suffix are touched. Deletions, and
/// changes whose revisions cannot be read, are left as they are. Returns
/// the number of changes annotated.
pub fn annotate_commits(
    language: &dyn Language,
    reader: &dyn RevisionReader,
    commits: &mut [CommitRecord],
) -> Result<usize, TfdError> {
    let mut annotated = 0;
    for commit in commits.iter_mut() {
        let parent = commit.parents.first().cloned();
        for change in &mut commit.changes {
            if !change.new_symbols.is_empty() || !change.referenced_symbols.is_empty() {
                continue;
            }
            if !change.path.ends_with(language.suffix()) {
                continue;
            }

            let before = match change.kind {
                ModificationKind::Add | ModificationKind::Copy => Some(Vec::new()),
                ModificationKind::Delete => None,
                ModificationKind::Rename | ModificationKind::Modify | ModificationKind::Unknown => {
                    let previous = change.old_path.as_deref().unwrap_or(&change.path);
                    match &parent {
                        Some(parent) => reader.read_at(parent, previous)?,
                        None => None,
                    }
                }
            };
            let Some(before) = before else {
                continue;
            };
            let Some(after) = reader.read_at(&commit.hash, &change.path)? else {
                tracing::debug!(hash = %commit.hash, path = %change.path, "revision not readable");
                continue;
            };

            let filled = annotate(language, change.clone(), &before, &after);
            *change = filled;
            annotated += 1;
        }
    }

    tracing::debug!(annotated, "annotated changes from revisions");
    Ok(annotated)
}

/// Strip `suffix` from `stem`, requiring a non-empty remainder.
fn strip_nonempty_suffix<'a>(stem: &'a str, suffix: &str) -> Option<&'a str> {
    stem.strip_suffix(suffix).filter(|rest| !rest.is_empty())
}

/// Strip `prefix` from `stem`, requiring a non-empty remainder.
fn strip_nonempty_prefix<'a>(stem: &'a str, prefix: &str) -> Option<&'a str> {
    stem.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}
