//! # testfirst-core
//!
//! The deterministic mining pipeline for testfirst - THE LOGIC.
//!
//! Given the extracted change history of a project and a snapshot of its
//! files, this crate decides for every production source whether its tests
//! were written before, together with, or after it.
//!
//! ## Pipeline
//!
//! 1. `history`: raw records are grouped into commits, the commit DAG is
//!    aligned into one merge-free sequence (`align`), and file identities
//!    are resolved across renames (`registry`) into a `TransactionLog`.
//! 2. `binding`: a `BindingStrategy` links tests to sources in the snapshot.
//! 3. `discriminator`: a classification runs over {log, graph}.
//!
//! ## Architectural Constraints
//!
//! - Batch and single-threaded, except optional parallel reference
//!   extraction (`parallel` feature)
//! - No floats: thresholds are per-mille integers
//! - `BTreeMap`/`BTreeSet` only, so every report is reproducible
//! - File contents reach the core only through an injected `LineReader`

// =============================================================================
// MODULES
// =============================================================================

pub mod align;
pub mod binding;
pub mod config;
pub mod discriminator;
pub mod formats;
pub mod history;
pub mod language;
pub mod primitives;
pub mod registry;
pub mod transaction;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    ChangeEvent, Commit, CommitRecord, FileId, ModificationKind, RawChange, RawRecord, TfdError,
};

// =============================================================================
// RE-EXPORTS: History
// =============================================================================

pub use align::{Branch, CommitAligner};
pub use history::{BranchHistory, History, group_records};
pub use registry::{IdentityRegistry, TransactionBuilder};
pub use transaction::{NameIndex, TransactionLog};

// =============================================================================
// RE-EXPORTS: Binding
// =============================================================================

pub use binding::{
    Artifact, BindingGraph, BindingStrategy, FsReader, GraphDiff, LineReader, MemoryReader,
    NameStrategy, ReferenceIndex, ReferenceStrategy, Repository, StrategyKind,
    TransitiveReferenceStrategy,
};
pub use language::{
    Java, Language, LanguageKind, Python, RevisionReader, annotate, annotate_commits,
};

// =============================================================================
// RE-EXPORTS: Analysis
// =============================================================================

pub use config::{AnalysisConfig, Threshold};
pub use discriminator::{
    AnalysisInput, BeforeAfterDiscriminator, BeforeAfterReport, BeforeSameAfterDiscriminator,
    BeforeSameAfterReport, BranchDiscriminator, BranchMode, BranchReport, BranchResult,
    ChangeClassifier, CommitSequenceDiscriminator, CommitSequenceReport, Discriminator,
    DiscriminatorKind, Interval, Report, SourceStats, Summary, SymbolChangeClassifier,
    ThresholdResult,
};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

#[cfg(feature = "crypto-hash")]
pub use formats::log_crypto_hash;
pub use formats::{LogHeader, log_checksum, log_from_bytes, log_to_bytes};
