//! # Formats
//!
//! Byte-level encodings of pipeline artifacts. File I/O stays in the app.

mod persistence;

#[cfg(feature = "crypto-hash")]
pub use persistence::log_crypto_hash;
pub use persistence::{LogHeader, log_checksum, log_from_bytes, log_to_bytes};
