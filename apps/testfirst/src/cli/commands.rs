//! # CLI Command Implementations
//!
//! File I/O for the pipeline: history records come from CSV, projects are
//! scanned from disk, configuration comes from TOML.

use serde::Serialize;
use std::path::{Path, PathBuf};
use testfirst_core::{
    AnalysisConfig, AnalysisInput, Discriminator, FsReader, History, RawRecord, Repository,
    TfdError, TransactionLog, annotate_commits, group_records, log_checksum, log_crypto_hash,
    log_from_bytes, log_to_bytes, primitives::LOG_MAGIC,
};
use walkdir::WalkDir;

use super::git::GitRevisions;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a history record file (512 MB).
const MAX_RECORDS_FILE_SIZE: u64 = 512 * 1024 * 1024;

/// Maximum size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TfdError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TfdError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TfdError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, TfdError> {
    let canonical = path.canonicalize().map_err(|e| {
        TfdError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TfdError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, TfdError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        TfdError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    let filename = path
        .file_name()
        .ok_or_else(|| TfdError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), TfdError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| TfdError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// INPUTS
// =============================================================================

/// Load the analysis configuration, or the defaults without a file.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, TfdError> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_CONFIG_FILE_SIZE)?;

    let text = std::fs::read_to_string(&path)
        .map_err(|e| TfdError::IoError(format!("Read config: {}", e)))?;
    let config: AnalysisConfig = toml::from_str(&text)
        .map_err(|e| TfdError::InvalidRecord(format!("{}: {}", path.display(), e)))?;
    config.validate()?;

    tracing::debug!(path = %path.display(), ?config, "loaded configuration");
    Ok(config)
}

/// Read history rows from a CSV file with a header line.
///
/// Columns: `hash, parents, file, modification_type, new_methods,
/// classes_used`. The last two may be omitted.
pub fn read_records(path: &Path) -> Result<Vec<RawRecord>, TfdError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_RECORDS_FILE_SIZE)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(|e| TfdError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: RawRecord = row.map_err(|e| TfdError::InvalidRecord(e.to_string()))?;
        records.push(record);
    }

    tracing::info!(path = %path.display(), rows = records.len(), "read history records");
    Ok(records)
}

/// Build the history of a record file.
///
/// With a `project` that is a git work tree, changes whose symbol columns
/// are empty get them from the file revisions.
pub fn load_history(
    path: &Path,
    config: &AnalysisConfig,
    project: Option<&Path>,
) -> Result<History, TfdError> {
    let mut commits = group_records(&read_records(path)?)?;

    if let Some(project) = project {
        match GitRevisions::open(project) {
            Some(revisions) => {
                let annotated =
                    annotate_commits(config.language.plugin(), &revisions, &mut commits)?;
                tracing::info!(project = %project.display(), annotated, "annotated changes");
            }
            None => {
                tracing::debug!(
                    project = %project.display(),
                    "not a git work tree, symbols left as given"
                );
            }
        }
    }

    if config.align {
        History::from_records(commits)
    } else {
        History::from_linear(&commits)
    }
}

/// Collect the files of a project, skipping hidden entries such as `.git`.
pub fn scan_repository(root: &Path, config: &AnalysisConfig) -> Result<Repository, TfdError> {
    let root = root.canonicalize().map_err(|e| {
        TfdError::IoError(format!("Invalid project root '{}': {}", root.display(), e))
    })?;

    let mut paths = Vec::new();
    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.map_err(|e| TfdError::IoError(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(&root) {
            paths.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    Repository::new(root, config.language, Box::new(FsReader), paths)
}

/// Read a log stored by `build`, in either format.
pub fn read_log(path: &Path) -> Result<TransactionLog, TfdError> {
    let path = validate_file_path(path)?;
    let bytes = std::fs::read(&path).map_err(|e| TfdError::IoError(format!("Read file: {}", e)))?;

    if bytes.starts_with(LOG_MAGIC) {
        return log_from_bytes(&bytes);
    }
    let log: TransactionLog = serde_json::from_slice(&bytes)
        .map_err(|e| TfdError::SerializationError(format!("{}: {}", path.display(), e)))?;
    log.validate()?;
    Ok(log)
}

// =============================================================================
// BUILD COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    output: &'a Path,
    format: &'a str,
    commits: usize,
    files: usize,
    branches: usize,
    bytes: usize,
}

/// Build the transaction log and write it to `output`.
pub fn cmd_build(
    records: &Path,
    output: &Path,
    format: &str,
    project: Option<&Path>,
    config: &AnalysisConfig,
    json_mode: bool,
) -> Result<(), TfdError> {
    let output = validate_output_path(output)?;
    let history = load_history(records, config, project)?;
    let log = history.log();

    let data = match format {
        "binary" => log_to_bytes(log)?,
        "json" => serde_json::to_vec_pretty(log)
            .map_err(|e| TfdError::SerializationError(e.to_string()))?,
        _ => {
            return Err(TfdError::SerializationError(format!(
                "Unknown format: {}. Use: binary, json",
                format
            )));
        }
    };

    std::fs::write(&output, &data).map_err(|e| TfdError::IoError(format!("Write file: {}", e)))?;

    let summary = BuildSummary {
        output: &output,
        format,
        commits: log.len(),
        files: log.file_count(),
        branches: history.branches().len(),
        bytes: data.len(),
    };
    if json_mode {
        return print_json(&summary);
    }

    println!("Commits:  {}", summary.commits);
    println!("Files:    {}", summary.files);
    println!("Branches: {}", summary.branches);
    println!("Wrote {} bytes to {}", summary.bytes, output.display());
    Ok(())
}

// =============================================================================
// BIND COMMAND
// =============================================================================

/// Scan a project and print its test → source links.
pub fn cmd_bind(project: &Path, config: &AnalysisConfig, json_mode: bool) -> Result<(), TfdError> {
    let repository = scan_repository(project, config)?;
    let graph = config.strategy.strategy(&repository).graph()?;

    if json_mode {
        let unlinked: Vec<&str> = graph.unlinked_tests().map(|a| a.path()).collect();
        return print_json(&serde_json::json!({
            "strategy": config.strategy,
            "sources": graph.sources().len(),
            "tests": graph.tests().len(),
            "links": graph.link_paths(),
            "unlinked_tests": unlinked,
        }));
    }

    println!("Strategy: {}", config.strategy);
    println!("Sources:  {}", graph.sources().len());
    println!("Tests:    {}", graph.tests().len());
    println!("Links:    {}", graph.link_count());
    println!();
    for (test, sources) in graph.link_paths() {
        if sources.is_empty() {
            println!("{} -> (none)", test);
        } else {
            println!("{} -> {}", test, sources.join(", "));
        }
    }
    Ok(())
}

// =============================================================================
// ANALYZE COMMAND
// =============================================================================

/// Classify the sources of `project` against the history in `records`.
pub fn cmd_analyze(
    records: &Path,
    project: &Path,
    config: &AnalysisConfig,
    json_mode: bool,
) -> Result<(), TfdError> {
    let history = load_history(records, config, Some(project))?;
    let repository = scan_repository(project, config)?;
    let graph = config.strategy.strategy(&repository).graph()?;

    let input = AnalysisInput::new(history.log(), &graph).with_branches(history.branches());
    let report = Discriminator::new(config.discriminator, input, config)?.statistics()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "discriminator": config.discriminator,
            "summary": report.summary(),
            "report": report,
        }));
    }

    print!("{}", report.output());
    Ok(())
}

// =============================================================================
// CHECKSUM COMMAND
// =============================================================================

/// Print the FNV-1a checksum and BLAKE3 hash of a stored log.
pub fn cmd_checksum(path: &Path, json_mode: bool) -> Result<(), TfdError> {
    let log = read_log(path)?;
    let checksum = log_checksum(&log)?;
    let blake3 = log_crypto_hash(&log)?;

    if json_mode {
        return print_json(&serde_json::json!({
            "commits": log.len(),
            "checksum": checksum,
            "blake3": blake3,
        }));
    }

    println!("Commits:  {}", log.len());
    println!("Checksum: {:016x}", checksum);
    println!("BLAKE3:   {}", blake3);
    Ok(())
}
