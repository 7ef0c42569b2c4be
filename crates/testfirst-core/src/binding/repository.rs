//! A project snapshot partitioned into tests and sources.

use super::{Artifact, LineReader, MemoryReader};
use crate::language::{Language, LanguageKind};
use crate::types::TfdError;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// The files of one project in one language.
///
/// Files without the language suffix are ignored. The language plugin
/// decides which of the rest are tests.
pub struct Repository {
    root: PathBuf,
    language: &'static dyn Language,
    reader: Box<dyn LineReader>,
    sources: BTreeSet<Artifact>,
    tests: BTreeSet<Artifact>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("language", &self.language.kind())
            .field("sources", &self.sources.len())
            .field("tests", &self.tests.len())
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Partition `paths` (relative to `root`) into tests and sources.
    pub fn new<I, S>(
        root: impl Into<PathBuf>,
        language: LanguageKind,
        reader: Box<dyn LineReader>,
        paths: I,
    ) -> Result<Self, TfdError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.into();
        let language = language.plugin();
        let mut sources = BTreeSet::new();
        let mut tests = BTreeSet::new();

        for path in paths {
            let artifact = Artifact::new(root.clone(), path);
            if !artifact.name().ends_with(language.suffix()) {
                continue;
            }
            if language.is_test(&artifact, reader.as_ref())? {
                tests.insert(artifact);
            } else {
                sources.insert(artifact);
            }
        }

        tracing::info!(
            root = %root.display(),
            language = %language.kind(),
            sources = sources.len(),
            tests = tests.len(),
            "partitioned repository"
        );

        Ok(Self {
            root,
            language,
            reader,
            sources,
            tests,
        })
    }

    /// Repository over every file of an in-memory reader.
    pub fn in_memory(
        root: impl Into<PathBuf>,
        language: LanguageKind,
        reader: MemoryReader,
    ) -> Result<Self, TfdError> {
        let paths: Vec<String> = reader.paths().map(str::to_string).collect();
        Self::new(root, language, Box::new(reader), paths)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn language(&self) -> &'static dyn Language {
        self.language
    }

    #[must_use]
    pub fn sources(&self) -> &BTreeSet<Artifact> {
        &self.sources
    }

    #[must_use]
    pub fn tests(&self) -> &BTreeSet<Artifact> {
        &self.tests
    }

    /// Read an artifact through the injected reader.
    pub fn read_lines(&self, artifact: &Artifact) -> Result<Vec<String>, TfdError> {
        self.reader.read_lines(artifact)
    }
}
