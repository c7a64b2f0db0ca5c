//! Error types for key derivation and sealing.

use thiserror::Error;

/// Errors that can occur while deriving keys or sealing blobs.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The signing capability refused or failed to sign.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// A key cannot be derived from an empty signature.
    #[error("empty signature")]
    EmptySignature,

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error (wrong key or tampered ciphertext).
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Sealed blob bytes are not in the expected layout.
    #[error("malformed sealed blob: {0}")]
    MalformedBlob(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] medledger_core::CoreError),
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, KeyError>;
