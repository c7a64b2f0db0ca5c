//! # Medledger Registry
//!
//! The on-ledger state machine: patient and doctor profiles, documents, and
//! the sharing lists that connect them.
//!
//! ## Overview
//!
//! Callers submit a [`SignedTransaction`] carrying one [`Instruction`]. The
//! [`Registry`] verifies the signature, treats the signer as the caller,
//! stages the transition in a [`TxContext`] and commits it as a single
//! atomic write. Every error aborts with no partial state change.
//!
//! ## Invariants
//!
//! After every committed transaction:
//!
//! - A document's owner is the patient that created it
//! - A doctor is in a document's access list exactly when the document is
//!   in that doctor's profile
//! - A patient profile lists exactly the documents that patient owns
//! - Access lists and profile lists never hold duplicates and never exceed
//!   the capacity fixed when the account was allocated
//!
//! ## Policies
//!
//! - Re-initialising an existing profile fails with `AlreadyExists`
//! - Deleting a shared document removes it from every doctor profile in the
//!   same commit
//! - Granting twice and revoking a never-granted identity are no-ops

pub mod access;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod instruction;
pub mod registry;

pub use config::RegistryConfig;
pub use context::TxContext;
pub use error::{RegistryError, Result};
pub use instruction::{Instruction, SignedTransaction, TX_SIGNATURE_DOMAIN};
pub use registry::{Receipt, Registry};
