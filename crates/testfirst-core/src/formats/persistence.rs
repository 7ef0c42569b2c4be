//! # Persistence Format
//!
//! Binary serialization for transaction logs.
//!
//! Format: Header (5 bytes) + postcard-serialized log.
//! - 4 bytes: Magic ("TFDL")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, and a
//! decoded log must pass [`TransactionLog::validate`].

use crate::primitives::{LOG_FORMAT_VERSION, LOG_MAGIC, MAX_LOG_PAYLOAD_SIZE};
use crate::transaction::TransactionLog;
use crate::types::TfdError;

const HEADER_SIZE: usize = 5;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding every encoded log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl LogHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *LOG_MAGIC,
            version: LOG_FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), TfdError> {
        if &self.magic != LOG_MAGIC {
            return Err(TfdError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != LOG_FORMAT_VERSION {
            return Err(TfdError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version, LOG_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TfdError> {
        if bytes.len() < HEADER_SIZE {
            return Err(TfdError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for LogHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Encode a log as header + payload.
pub fn log_to_bytes(log: &TransactionLog) -> Result<Vec<u8>, TfdError> {
    let payload =
        postcard::to_stdvec(log).map_err(|e| TfdError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&LogHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a log produced by [`log_to_bytes`].
pub fn log_from_bytes(bytes: &[u8]) -> Result<TransactionLog, TfdError> {
    if bytes.len() < HEADER_SIZE {
        return Err(TfdError::SerializationError(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }
    if bytes.len() > MAX_LOG_PAYLOAD_SIZE {
        return Err(TfdError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_LOG_PAYLOAD_SIZE
        )));
    }

    LogHeader::from_bytes(bytes)?.validate()?;

    let log: TransactionLog = postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        TfdError::SerializationError(format!("Failed to deserialize log data: {}", e))
    })?;
    log.validate()?;
    Ok(log)
}

/// 64-bit FNV-1a checksum of the encoded log.
///
/// Detects accidental corruption only; it is not collision resistant.
pub fn log_checksum(log: &TransactionLog) -> Result<u64, TfdError> {
    let bytes = log_to_bytes(log)?;
    Ok(bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    }))
}

/// BLAKE3 hash of the encoded log, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
pub fn log_crypto_hash(log: &TransactionLog) -> Result<String, TfdError> {
    let bytes = log_to_bytes(log)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
