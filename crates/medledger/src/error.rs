//! Error types for the vault.

use medledger_core::{ContentAddress, CoreError};
use medledger_keys::KeyError;
use medledger_registry::RegistryError;
use thiserror::Error;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Registry rejected or failed the transaction.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Key derivation, signing or decryption failed.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// No blob is stored under the address.
    #[error("content not found: {0}")]
    ContentNotFound(ContentAddress),

    /// Stored bytes do not hash to their address.
    #[error("content at {expected} hashes to {actual}")]
    ContentMismatch {
        expected: ContentAddress,
        actual: ContentAddress,
    },

    /// The address is not a `b3:` content address.
    #[error("invalid content address: {0}")]
    InvalidContentAddress(String),

    /// Upload request rejected before anything was stored.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Filesystem error from a local content store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob metadata could not be encoded or decoded.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl VaultError {
    /// Whether resubmitting the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VaultError::Registry(e) if e.is_retryable())
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
