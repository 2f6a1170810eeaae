//! Error types for the store module.

use blockledger_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Block file (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Chain not found.
    #[error("chain not found: {0}")]
    ChainNotFound(String),

    /// A block already exists at the position being written.
    #[error("conflict in chain {chain}: block {index} already exists")]
    Conflict { chain: String, index: u64 },

    /// A persisted block failed validation.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Invalid core value (name, timestamp, hash).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock was poisoned by a panicking holder.
    #[error("lock poisoned")]
    LockPoisoned,

    /// A blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
