//! Error types for the registry.

use medledger_core::{Address, CoreError, Identity};
use medledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur while executing or querying the registry.
///
/// Every error aborts the attempted transaction with no state change.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The caller is not the identity the operation requires.
    #[error("unauthorized: {caller} is not {required}")]
    Unauthorized { caller: Identity, required: Identity },

    /// The operation needs a patient profile that does not exist.
    #[error("no patient profile for {0}")]
    NoPatientProfile(Identity),

    /// An account already exists at the target address.
    #[error("account already exists at {0}")]
    AlreadyExists(Address),

    /// A list field is at its fixed bound.
    #[error("capacity of {capacity} exceeded at {address}")]
    CapacityExceeded { address: Address, capacity: usize },

    /// A referenced document or profile is absent.
    #[error("account not found at {0}")]
    NotFound(Address),

    /// Malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The transaction signature does not verify.
    #[error("invalid transaction signature")]
    InvalidSignature,

    /// Another transaction changed an account this one read. Retry.
    #[error("write conflict at {0}")]
    Conflict(Address),

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl RegistryError {
    /// Whether resubmitting the same transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Conflict(_))
    }

    /// Stable name of the error kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::Unauthorized { .. } => "unauthorized",
            RegistryError::NoPatientProfile(_) => "no_patient_profile",
            RegistryError::AlreadyExists(_) => "already_exists",
            RegistryError::CapacityExceeded { .. } => "capacity_exceeded",
            RegistryError::NotFound(_) => "not_found",
            RegistryError::InvalidArgument(_) => "invalid_argument",
            RegistryError::InvalidSignature => "invalid_signature",
            RegistryError::Conflict(_) => "conflict",
            RegistryError::Store(_) => "store",
        }
    }

    /// Map a bounded-list insert failure onto the account it happened in.
    pub(crate) fn capacity_at(address: Address, err: CoreError) -> Self {
        match err {
            CoreError::CapacityExceeded { capacity } => {
                RegistryError::CapacityExceeded { address, capacity }
            }
            other => RegistryError::InvalidArgument(other.to_string()),
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { address, .. } => RegistryError::Conflict(address),
            other => RegistryError::Store(other),
        }
    }
}

impl From<CoreError> for RegistryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                RegistryError::InvalidSignature
            }
            other => RegistryError::InvalidArgument(other.to_string()),
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
