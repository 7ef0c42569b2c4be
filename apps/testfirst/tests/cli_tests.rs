//! Tests for the file-facing CLI helpers and commands.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use testfirst::cli::{
    GitRevisions, cmd_analyze, cmd_bind, cmd_build, cmd_checksum, git_available, load_config,
    load_history, read_log, read_records, scan_repository,
};
use testfirst_core::{
    AnalysisConfig, ChangeClassifier, ChangeEvent, DiscriminatorKind, History, LanguageKind,
    ModificationKind, StrategyKind, SymbolChangeClassifier,
};

const RECORDS: &str = "\
hash,parents,file,modification_type,new_methods,classes_used
c0,,src/demo/Engine.java,A,run,
c1,c0,test/demo/EngineTest.java,A,testRun,Engine
c2,c1,src/demo/Parser.java,A,parse,
c2,c1,test/demo/ParserTest.java,A,testParse,Parser
";

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "src/demo/Engine.java", "package demo;\npublic class Engine {}");
    write(dir.path(), "src/demo/Parser.java", "package demo;\npublic class Parser {}");
    write(
        dir.path(),
        "test/demo/EngineTest.java",
        "package demo;\nimport demo.Engine;\nclass EngineTest {\n@Test\nvoid run() {}\n}",
    );
    write(
        dir.path(),
        "test/demo/ParserTest.java",
        "package demo;\nimport demo.Parser;\nclass ParserTest {\n@Test\nvoid parse() {}\n}",
    );
    write(dir.path(), ".git/HEAD", "ref: refs/heads/main");
    write(dir.path(), "history.csv", RECORDS);
    dir
}

// =============================================================================
// INPUT TESTS
// =============================================================================

#[test]
fn test_read_records_fills_optional_columns() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "short.csv",
        "hash,parents,file,modification_type\nc0,,A.java,A\nc1,c0,A.java,M\n",
    );

    let records = read_records(&dir.path().join("short.csv")).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].parents, "c0");
    assert!(records[1].new_methods.is_empty());
}

#[test]
fn test_read_records_missing_file() {
    assert!(read_records(Path::new("/definitely/not/here.csv")).is_err());
}

#[test]
fn test_load_config_from_toml() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "testfirst.toml",
        "language = \"python\"\nstrategy = \"name\"\ndiscriminator = \"commit_sequence\"\nthresholds = [1.0, 0.5]\n",
    );

    let config = load_config(Some(&dir.path().join("testfirst.toml"))).unwrap();
    assert_eq!(config.language, LanguageKind::Python);
    assert_eq!(config.strategy, StrategyKind::Name);
    assert_eq!(config.discriminator, DiscriminatorKind::CommitSequence);
    assert_eq!(config.thresholds.len(), 2);
    assert_eq!(load_config(None).unwrap(), AnalysisConfig::default());
}

#[test]
fn test_load_config_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "bad.toml", "colour = \"blue\"\n");
    assert!(load_config(Some(&dir.path().join("bad.toml"))).is_err());
}

#[test]
fn test_scan_repository_skips_hidden_and_foreign_files() {
    let dir = project();
    let repository = scan_repository(dir.path(), &AnalysisConfig::default()).unwrap();
    assert_eq!(repository.sources().len(), 2);
    assert_eq!(repository.tests().len(), 2);
}

// =============================================================================
// COMMAND TESTS
// =============================================================================

#[test]
fn test_build_binary_roundtrip() {
    let dir = project();
    let records = dir.path().join("history.csv");
    let output = dir.path().join("history.tfdl");

    let config = AnalysisConfig::default();
    cmd_build(&records, &output, "binary", None, &config, false).unwrap();

    let stored = read_log(&output).unwrap();
    let expected = load_history(&records, &config, None).unwrap().into_log();
    assert_eq!(stored, expected);
    assert_eq!(stored.len(), 3);
    cmd_checksum(&output, true).unwrap();
}

#[test]
fn test_build_json_roundtrip() {
    let dir = project();
    let records = dir.path().join("history.csv");
    let output = dir.path().join("history.json");

    let config = AnalysisConfig {
        align: false,
        ..AnalysisConfig::default()
    };
    cmd_build(&records, &output, "json", None, &config, true).unwrap();
    assert_eq!(read_log(&output).unwrap().file_count(), 4);
}

#[test]
fn test_build_unknown_format() {
    let dir = project();
    let result = cmd_build(
        &dir.path().join("history.csv"),
        &dir.path().join("out"),
        "yaml",
        None,
        &AnalysisConfig::default(),
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_bind_and_analyze_run() {
    let dir = project();
    let config = AnalysisConfig::default();
    cmd_bind(dir.path(), &config, true).unwrap();
    cmd_analyze(&dir.path().join("history.csv"), dir.path(), &config, false).unwrap();

    let sequence = AnalysisConfig {
        discriminator: DiscriminatorKind::CommitSequence,
        ..AnalysisConfig::default()
    };
    cmd_analyze(&dir.path().join("history.csv"), dir.path(), &sequence, true).unwrap();
}

#[test]
fn test_analyze_with_stale_snapshot_fails() {
    let dir = project();
    write(dir.path(), "src/demo/Lexer.java", "package demo;\nclass Lexer {}");
    let result = cmd_analyze(
        &dir.path().join("history.csv"),
        dir.path(),
        &AnalysisConfig::default(),
        false,
    );
    assert!(result.is_err());
}

// =============================================================================
// GIT REVISION TESTS
// =============================================================================

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

fn event(history: &History, number: usize, kind: ModificationKind) -> ChangeEvent {
    history.log().commits()[number]
        .changes
        .iter()
        .find(|event| event.kind == kind)
        .cloned()
        .unwrap()
}

#[test]
fn test_git_revisions_fill_missing_symbol_columns() {
    if !git_available() {
        return;
    }
    let repo = TempDir::new().unwrap();
    let root = repo.path();
    git(root, &["init", "-q"]);
    git(root, &["config", "user.email", "dev@example.com"]);
    git(root, &["config", "user.name", "Dev"]);
    git(root, &["config", "commit.gpgsign", "false"]);

    write(
        root,
        "src/demo/Engine.java",
        "package demo;\npublic class Engine {\n    public void start() {\n    }\n}\n",
    );
    let c0 = commit_all(root, "engine");
    write(
        root,
        "src/demo/Engine.java",
        "package demo;\npublic class Engine {\n    public void start() {\n    }\n    public void stop() {\n    }\n}\n",
    );
    write(
        root,
        "test/demo/EngineTest.java",
        "package demo;\nclass EngineTest {\n    @Test\n    public void stops() {\n        new Engine().stop();\n    }\n}\n",
    );
    let c1 = commit_all(root, "stop");

    let inputs = TempDir::new().unwrap();
    write(
        inputs.path(),
        "history.csv",
        &format!(
            "hash,parents,file,modification_type\n\
             {c0},,src/demo/Engine.java,A\n\
             {c1},{c0},src/demo/Engine.java,M\n\
             {c1},{c0},test/demo/EngineTest.java,A\n"
        ),
    );
    let records = inputs.path().join("history.csv");
    let config = AnalysisConfig::default();
    let classifier = SymbolChangeClassifier::default();

    let bare = load_history(&records, &config, None).unwrap();
    assert!(!classifier.is_substantial(&event(&bare, 1, ModificationKind::Modify)));

    let annotated = load_history(&records, &config, Some(root)).unwrap();
    let modify = event(&annotated, 1, ModificationKind::Modify);
    assert!(classifier.is_substantial(&modify));
    assert!(modify.new_symbols.contains("stop"));
    let test_add = event(&annotated, 1, ModificationKind::Add);
    assert!(test_add.referenced_symbols.contains("Engine"));

    let output = inputs.path().join("history.tfdl");
    cmd_build(&records, &output, "binary", Some(root), &config, false).unwrap();
    assert_eq!(read_log(&output).unwrap(), annotated.into_log());
}

#[test]
fn test_git_revisions_require_work_tree_root() {
    let dir = project();
    // A bare `.git/HEAD` file is not a repository.
    assert!(GitRevisions::open(dir.path()).is_none());
}
