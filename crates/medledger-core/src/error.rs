//! Error types for medledger core.

use thiserror::Error;

/// Core errors from primitive construction, signatures and layout decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid content address: {0}")]
    InvalidContentAddress(String),

    #[error("list is at its fixed capacity of {capacity}")]
    CapacityExceeded { capacity: usize },

    #[error("unsupported account layout version: {0}")]
    UnsupportedLayout(u64),

    #[error("unknown account kind: {0}")]
    UnknownAccountKind(u64),

    #[error("malformed account: {0}")]
    MalformedAccount(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
