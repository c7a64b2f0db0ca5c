//! Error types for the store module.

use medledger_core::{Address, CoreError};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A persisted account failed to decode.
    #[error("account decoding error: {0}")]
    Codec(#[from] CoreError),

    /// An account changed since it was read. Nothing was applied.
    #[error("conflict at {address}: expected version {expected:?}, found {actual:?}")]
    Conflict {
        address: Address,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// The write set itself is malformed.
    #[error("invalid write set: {0}")]
    InvalidWriteSet(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Whether retrying the transaction against fresh state may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
