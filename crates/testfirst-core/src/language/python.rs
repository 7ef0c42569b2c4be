//! Python heuristics: `test_*.py` and `*_test.py` are tests, the file stem
//! is the module name, `import` and `from ... import` lines are references.

use super::{Language, LanguageKind, strip_nonempty_prefix, strip_nonempty_suffix};
use crate::binding::{Artifact, LineReader};
use crate::primitives::PYTHON_SUFFIX;
use crate::types::TfdError;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^import\s+(\w+(?:\.\w+)*)").expect("valid regex literal")
});

static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^from\s+(\w+(?:\.\w+)*)\s+import\s+(\w+(?:\s*,\s*\w+)*)")
        .expect("valid regex literal")
});

static FUNCTION_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:async\s+)?def\s+(\w+)\s*\(").expect("valid regex literal")
});

// `Name()` or `name.attr(`
static CALL_USAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\(\)|(\w+)\.\w+\(").expect("valid regex literal")
});

/// The Python language plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Python;

impl Language for Python {
    fn kind(&self) -> LanguageKind {
        LanguageKind::Python
    }

    fn suffix(&self) -> &'static str {
        PYTHON_SUFFIX
    }

    fn is_test(&self, artifact: &Artifact, _reader: &dyn LineReader) -> Result<bool, TfdError> {
        let stem = artifact.stem();
        Ok(artifact.name().ends_with(PYTHON_SUFFIX)
            && (stem.starts_with("test_") || stem.ends_with("_test")))
    }

    fn module_name(&self, artifact: &Artifact, _lines: &[String]) -> Option<String> {
        Some(artifact.stem().to_string())
    }

    fn references(&self, lines: &[String]) -> BTreeSet<String> {
        let mut imports = BTreeSet::new();
        for line in lines {
            let line = line.trim();
            if let Some(caps) = FROM_IMPORT.captures(line) {
                if let Some(module) = caps.get(1).and_then(|m| m.as_str().rsplit('.').next()) {
                    imports.insert(module.to_string());
                }
                if let Some(names) = caps.get(2) {
                    imports.extend(
                        names
                            .as_str()
                            .split(',')
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(str::to_string),
                    );
                }
            } else if let Some(caps) = IMPORT.captures(line) {
                if let Some(module) = caps.get(1).and_then(|m| m.as_str().rsplit('.').next()) {
                    imports.insert(module.to_string());
                }
            }
        }
        imports
    }

    fn test_subject(&self, stem: &str) -> Option<String> {
        strip_nonempty_prefix(stem, "test_")
            .or_else(|| strip_nonempty_suffix(stem, "_test"))
            .map(str::to_string)
    }

    fn defined_symbol(&self, line: &str) -> Option<String> {
        FUNCTION_DEFINITION
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|name| name.as_str().to_string())
    }

    fn used_symbols(&self, lines: &[String]) -> BTreeSet<String> {
        lines
            .iter()
            .flat_map(|line| CALL_USAGE.captures_iter(line))
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|name| name.as_str().to_string())
            .collect()
    }
}
