//! # Innate Primitives
//!
//! Hardcoded constants shared across the mining pipeline.
//!
//! These values define the wire format of extracted history, the binary
//! layout of persisted transaction logs, and the fixed-point scale used for
//! leniency thresholds. They are compiled in and immutable at runtime.

/// Delimiter joining multi-valued record fields.
///
/// Used for parent hash lists, `old|new` rename paths, and symbol sets.
pub const FIELD_DELIMITER: char = '|';

/// Magic bytes for the binary transaction log header.
///
/// - File Header = Magic Bytes ("TFDL") + Version (u8) before payload.
pub const LOG_MAGIC: &[u8; 4] = b"TFDL";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const LOG_FORMAT_VERSION: u8 = 1;

/// Maximum accepted payload size when decoding a persisted log (256 MB).
pub const MAX_LOG_PAYLOAD_SIZE: usize = 256 * 1024 * 1024;

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Fixed-point scale for leniency thresholds: 1000 per-mille equals 1.0.
pub const PERMILLE_SCALE: u16 = 1000;

/// Maximum number of decimal digits accepted when parsing a threshold.
pub const THRESHOLD_DECIMALS: usize = 3;

/// Thresholds reported by the commit-sequence discriminator when none are
/// configured: 1.0, 0.75 and 0.5.
pub const DEFAULT_THRESHOLDS: [u16; 3] = [1000, 750, 500];

// =============================================================================
// LANGUAGE MARKERS
// =============================================================================

/// Annotation marking a Java file as a test.
pub const JAVA_TEST_MARKER: &str = "@Test";

/// Java file suffix.
pub const JAVA_SUFFIX: &str = ".java";

/// Python file suffix.
pub const PYTHON_SUFFIX: &str = ".py";
