//! # Analysis Configuration
//!
//! Settings for one analysis run. The binary loads them from TOML and lets
//! command-line flags override individual fields.
//!
//! Leniency thresholds are fixed-point per-mille values so that every
//! comparison is exact integer arithmetic.

use crate::binding::StrategyKind;
use crate::discriminator::{BranchMode, DiscriminatorKind};
use crate::language::LanguageKind;
use crate::primitives::{DEFAULT_THRESHOLDS, PERMILLE_SCALE, THRESHOLD_DECIMALS};
use crate::types::TfdError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// THRESHOLD
// =============================================================================

/// Fraction of qualifying intervals required to classify a source as
/// test-first, stored in per-mille (`1000` = 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(u16);

impl Threshold {
    /// Every interval must qualify.
    pub const FULL: Self = Self(PERMILLE_SCALE);

    /// Create a threshold from a per-mille value.
    ///
    /// # Errors
    /// Returns `TfdError::InvalidThreshold` above 1000.
    pub fn from_permille(permille: u16) -> Result<Self, TfdError> {
        if permille > PERMILLE_SCALE {
            return Err(TfdError::InvalidThreshold(format!(
                "{} per-mille exceeds 1.0",
                permille
            )));
        }
        Ok(Self(permille))
    }

    #[must_use]
    pub const fn permille(self) -> u16 {
        self.0
    }

    /// Whether `qualifying` out of `total` intervals meets this threshold.
    ///
    /// No intervals never meets a threshold.
    #[must_use]
    pub fn admits(self, qualifying: usize, total: usize) -> bool {
        total > 0 && qualifying * PERMILLE_SCALE as usize >= self.0 as usize * total
    }

    /// The default report thresholds: 1.0, 0.75 and 0.5.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_THRESHOLDS.iter().map(|&p| Self(p)).collect()
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / PERMILLE_SCALE;
        let fraction = self.0 % PERMILLE_SCALE;
        if fraction == 0 {
            return write!(f, "{}.0", whole);
        }
        let digits = format!("{:03}", fraction);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Threshold {
    type Err = TfdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || TfdError::InvalidThreshold(format!("'{}' is not a fraction in [0, 1]", s));

        let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
            || fraction.len() > THRESHOLD_DECIMALS
        {
            return Err(invalid());
        }

        let whole: u32 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut padded = fraction.to_string();
        while padded.len() < THRESHOLD_DECIMALS {
            padded.push('0');
        }
        let fraction: u32 = padded.parse().map_err(|_| invalid())?;

        let permille = whole
            .checked_mul(u32::from(PERMILLE_SCALE))
            .and_then(|w| w.checked_add(fraction))
            .ok_or_else(invalid)?;
        if permille > u32::from(PERMILLE_SCALE) {
            return Err(invalid());
        }
        Ok(Self(permille as u16))
    }
}

impl Serialize for Threshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct ThresholdVisitor;

impl Visitor<'_> for ThresholdVisitor {
    type Value = Threshold;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a fraction between 0 and 1, as a number or a string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Threshold, E> {
        v.parse().map_err(E::custom)
    }

    // Formatting keeps the conversion exact for literals such as 0.75.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Threshold, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Threshold, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Threshold, E> {
        self.visit_str(&v.to_string())
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ThresholdVisitor)
    }
}

// =============================================================================
// ANALYSIS CONFIG
// =============================================================================

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub language: LanguageKind,
    pub strategy: StrategyKind,
    pub discriminator: DiscriminatorKind,
    /// Per-branch classification used by the branch-aware discriminator.
    pub branch_mode: BranchMode,
    /// Threshold deciding the commit-sequence test-first set.
    pub threshold: Threshold,
    /// Thresholds reported by the commit-sequence discriminator.
    pub thresholds: Vec<Threshold>,
    /// Count a test edit only if it references the source's symbol.
    pub require_reference: bool,
    /// Splice side branches into the main line before building the log.
    pub align: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            language: LanguageKind::default(),
            strategy: StrategyKind::default(),
            discriminator: DiscriminatorKind::default(),
            branch_mode: BranchMode::default(),
            threshold: Threshold::default(),
            thresholds: Threshold::defaults(),
            require_reference: true,
            align: true,
        }
    }
}

impl AnalysisConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), TfdError> {
        if self.thresholds.is_empty() {
            return Err(TfdError::InvalidThreshold(
                "at least one report threshold is required".to_string(),
            ));
        }
        Ok(())
    }
}
