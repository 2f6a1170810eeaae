//! Error types for blockledger core primitives.

use thiserror::Error;

/// Errors raised while building or decoding core primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("chain name is empty after normalization")]
    EmptyChainName,

    #[error("invalid timestamp {0:?}: expected 14 digits (YYYYMMDDHHmmss)")]
    InvalidTimestamp(String),

    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("invalid previous hash: {0} bytes is neither a sentinel nor a digest")]
    InvalidPreviousHash(usize),

    #[error("timestamp {0} is outside years 0000-9999")]
    TimestampOutOfRange(String),
}
