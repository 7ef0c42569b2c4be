//! # Binding Graph Builder
//!
//! Links test artifacts to the production artifacts they exercise.
//!
//! ## Strategies
//!
//! | Kind | Links a test to |
//! |------|-----------------|
//! | `Name` | sources whose stem matches the test stem without its naming convention |
//! | `Reference` | sources whose module name the test references |
//! | `TransitiveReference` | as `Reference`, plus everything those sources reference |
//!
//! File content is only ever read through an injected [`LineReader`].

mod graph;
mod name;
mod reference;
mod repository;

pub use graph::{BindingGraph, GraphDiff};
pub use name::NameStrategy;
pub use reference::{ReferenceIndex, ReferenceStrategy, TransitiveReferenceStrategy};
pub use repository::Repository;

use crate::types::TfdError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// ARTIFACT
// =============================================================================

/// A file of a project snapshot.
///
/// Equality, ordering and hashing use the relative path only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    project: PathBuf,
    path: String,
}

impl Artifact {
    /// Create an artifact. Path separators are normalized to `/`.
    #[must_use]
    pub fn new(project: impl Into<PathBuf>, path: impl AsRef<str>) -> Self {
        let path = path.as_ref().replace('\\', "/");
        Self {
            project: project.into(),
            path: path.trim_start_matches("./").to_string(),
        }
    }

    /// Root of the containing project.
    #[must_use]
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Path relative to the project root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name including its extension.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without its extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        let name = self.name();
        match name.rfind('.') {
            Some(dot) if dot > 0 => &name[..dot],
            _ => name,
        }
    }

    /// Location on disk.
    #[must_use]
    pub fn absolute_path(&self) -> PathBuf {
        self.project.join(&self.path)
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Artifact {}

impl PartialOrd for Artifact {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Artifact {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl Hash for Artifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

// =============================================================================
// LINE READERS
// =============================================================================

/// Capability to read an artifact's content.
pub trait LineReader: Send + Sync {
    fn read_lines(&self, artifact: &Artifact) -> Result<Vec<String>, TfdError>;
}

/// Reads artifacts from disk. Invalid UTF-8 is replaced, not rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl LineReader for FsReader {
    fn read_lines(&self, artifact: &Artifact) -> Result<Vec<String>, TfdError> {
        let path = artifact.absolute_path();
        let bytes = std::fs::read(&path)
            .map_err(|e| TfdError::IoError(format!("{}: {}", path.display(), e)))?;
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// In-memory file contents keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: BTreeMap<String, Vec<String>>,
}

impl MemoryReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` under `path`.
    pub fn insert(&mut self, path: impl Into<String>, content: &str) {
        self.files
            .insert(path.into(), content.lines().map(str::to_string).collect());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    /// Relative paths of all stored files.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl LineReader for MemoryReader {
    fn read_lines(&self, artifact: &Artifact) -> Result<Vec<String>, TfdError> {
        self.files
            .get(artifact.path())
            .cloned()
            .ok_or_else(|| TfdError::IoError(format!("no such file: {}", artifact.path())))
    }
}

// =============================================================================
// STRATEGIES
// =============================================================================

/// A way of linking tests to sources.
///
/// `graph` is read-only: calling it twice yields equal graphs.
pub trait BindingStrategy {
    fn kind(&self) -> StrategyKind;

    fn graph(&self) -> Result<BindingGraph, TfdError>;
}

/// Available binding strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Name,
    #[default]
    Reference,
    TransitiveReference,
}

impl StrategyKind {
    /// Construct the strategy over `repository`.
    #[must_use]
    pub fn strategy<'r>(self, repository: &'r Repository) -> Box<dyn BindingStrategy + 'r> {
        match self {
            Self::Name => Box::new(NameStrategy::new(repository)),
            Self::Reference => Box::new(ReferenceStrategy::new(repository)),
            Self::TransitiveReference => Box::new(TransitiveReferenceStrategy::new(repository)),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Reference => "reference",
            Self::TransitiveReference => "transitive_reference",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = TfdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "name" => Ok(Self::Name),
            "reference" | "import" => Ok(Self::Reference),
            "transitive_reference" | "transitive" | "recursive_import" => {
                Ok(Self::TransitiveReference)
            }
            other => Err(TfdError::InvalidRecord(format!(
                "unknown binding strategy '{}'",
                other
            ))),
        }
    }
}
