//! Error types for the ledger facade.

use blockledger_core::CoreError;
use blockledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur while setting up or using a ledger.
///
/// Chain operations report outcomes as sentinel variants; this type is
/// for startup and for callers of the `try_*` methods.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Invalid name, timestamp or hash.
    #[error("invalid value: {0}")]
    Core(#[from] CoreError),

    /// Unusable startup configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
