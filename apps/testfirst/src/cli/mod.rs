//! # testfirst CLI Module
//!
//! ## Available Commands
//!
//! - `build` - Build the aligned transaction log from history records
//! - `bind` - Link tests to sources in a project snapshot
//! - `analyze` - Classify sources as test-first or test-after
//! - `checksum` - Fingerprint a stored transaction log

mod commands;
mod git;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testfirst_core::{
    AnalysisConfig, BranchMode, DiscriminatorKind, LanguageKind, StrategyKind, TfdError, Threshold,
};

pub use commands::*;
pub use git::{GitRevisions, git_available};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// testfirst - test-first development mining
///
/// Reads a project's linearized change history and its file snapshot and
/// decides, per source file, whether its tests came first.
#[derive(Parser, Debug)]
#[command(name = "testfirst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Analysis configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides applied on top of the configuration file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// Project language (java, python)
    #[arg(short, long)]
    pub language: Option<LanguageKind>,

    /// Binding strategy (name, reference, transitive_reference)
    #[arg(short, long)]
    pub strategy: Option<StrategyKind>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the aligned transaction log from history records
    Build {
        /// CSV file of history records
        #[arg(short, long)]
        records: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (binary, json)
        #[arg(short = 't', long, default_value = "binary")]
        format: String,

        /// Take records in file order instead of aligning the commit graph
        #[arg(long)]
        no_align: bool,

        /// Git work tree that fills in missing symbol columns
        #[arg(short, long)]
        project: Option<PathBuf>,

        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Link tests to sources in a project snapshot
    Bind {
        /// Project root
        #[arg(short, long)]
        project: PathBuf,

        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Classify sources as test-first or test-after
    Analyze {
        /// CSV file of history records
        #[arg(short, long)]
        records: PathBuf,

        /// Project root
        #[arg(short, long)]
        project: PathBuf,

        #[command(flatten)]
        args: AnalysisArgs,

        /// Discriminator (before_after, before_same_after, commit_sequence, branch)
        #[arg(short, long)]
        discriminator: Option<DiscriminatorKind>,

        /// Per-branch classification for the branch discriminator
        #[arg(long)]
        branch_mode: Option<BranchMode>,

        /// Deciding commit-sequence threshold, e.g. 0.75
        #[arg(long)]
        threshold: Option<Threshold>,

        /// Count test edits even when they do not reference the source
        #[arg(long)]
        any_reference: bool,
    },

    /// Fingerprint a stored transaction log
    Checksum {
        /// Log file (binary or JSON)
        #[arg(short, long)]
        log: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), TfdError> {
    let json_mode = cli.json_mode;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            records,
            output,
            format,
            no_align,
            project,
            args,
        } => {
            let mut config = args.apply(config);
            if no_align {
                config.align = false;
            }
            cmd_build(
                &records,
                &output,
                &format,
                project.as_deref(),
                &config,
                json_mode,
            )
        }
        Commands::Bind { project, args } => {
            let config = args.apply(config);
            cmd_bind(&project, &config, json_mode)
        }
        Commands::Analyze {
            records,
            project,
            args,
            discriminator,
            branch_mode,
            threshold,
            any_reference,
        } => {
            let mut config = args.apply(config);
            if let Some(discriminator) = discriminator {
                config.discriminator = discriminator;
            }
            if let Some(branch_mode) = branch_mode {
                config.branch_mode = branch_mode;
            }
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }
            if any_reference {
                config.require_reference = false;
            }
            cmd_analyze(&records, &project, &config, json_mode)
        }
        Commands::Checksum { log } => cmd_checksum(&log, json_mode),
    }
}

impl AnalysisArgs {
    /// Overlay the flags that were given onto `config`.
    #[must_use]
    pub fn apply(&self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        config
    }
}
