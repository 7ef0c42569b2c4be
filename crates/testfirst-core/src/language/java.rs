//! Java heuristics: `@Test` marks tests, `package` + class name is the
//! canonical module name, `import` statements are references.

use super::{Language, LanguageKind, strip_nonempty_prefix, strip_nonempty_suffix};
use crate::binding::{Artifact, LineReader};
use crate::primitives::{JAVA_SUFFIX, JAVA_TEST_MARKER};
use crate::types::TfdError;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static METHOD_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:public|private|protected)\s+(?:static\s+)?(?:final\s+)?[\w<>\[\],\s]+?\s+(\w+)\s*\([^)]*\)",
    )
    .expect("valid regex literal")
});

// `new Type(` or `Type.method(`
static TYPE_USAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:new\s+(\w+)|(\w+)\.[\w<>]+\()").expect("valid regex literal")
});

/// The Java language plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Java;

impl Language for Java {
    fn kind(&self) -> LanguageKind {
        LanguageKind::Java
    }

    fn suffix(&self) -> &'static str {
        JAVA_SUFFIX
    }

    fn is_test(&self, artifact: &Artifact, reader: &dyn LineReader) -> Result<bool, TfdError> {
        Ok(reader
            .read_lines(artifact)?
            .iter()
            .any(|line| line.contains(JAVA_TEST_MARKER)))
    }

    fn module_name(&self, artifact: &Artifact, lines: &[String]) -> Option<String> {
        let package = lines.iter().find_map(|line| {
            line.trim()
                .strip_prefix("package ")
                .map(|rest| rest.trim().trim_end_matches(';').trim().to_string())
        })?;
        Some(format!("{}.{}", package, artifact.stem()))
    }

    fn references(&self, lines: &[String]) -> BTreeSet<String> {
        let mut imports = BTreeSet::new();
        for line in lines {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("import ") {
                let rest = rest.trim();
                let rest = rest.strip_prefix("static ").unwrap_or(rest);
                let name = rest.trim_end_matches(';').trim();
                if !name.is_empty() {
                    imports.insert(name.to_string());
                }
            } else if line.contains("class ") || line.contains("interface ") {
                // Imports precede the first type declaration.
                break;
            }
        }
        imports
    }

    fn test_subject(&self, stem: &str) -> Option<String> {
        strip_nonempty_suffix(stem, "Tests")
            .or_else(|| strip_nonempty_suffix(stem, "Test"))
            .or_else(|| strip_nonempty_prefix(stem, "Test"))
            .map(str::to_string)
    }

    fn defined_symbol(&self, line: &str) -> Option<String> {
        METHOD_DEFINITION
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|name| name.as_str().to_string())
    }

    fn used_symbols(&self, lines: &[String]) -> BTreeSet<String> {
        lines
            .iter()
            .flat_map(|line| TYPE_USAGE.captures_iter(line))
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|name| name.as_str().to_string())
            .collect()
    }
}
