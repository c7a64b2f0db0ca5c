//! # Medledger Core
//!
//! Pure primitives for medledger: identities, derived addresses, account
//! records and their canonical layout.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over the records the registry keeps.
//!
//! ## Key Types
//!
//! - [`Identity`] - Ed25519 public key naming a patient or doctor
//! - [`Address`] - Deterministically derived account address
//! - [`Account`] - A patient profile, doctor profile or document record
//! - [`BoundedSet`] - Fixed-capacity, duplicate-free list field
//!
//! ## Canonicalization
//!
//! Accounts are persisted as deterministic CBOR. See [`canonical`] module.

pub mod account;
pub mod address;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod types;

pub use account::{Account, AccountKind, BoundedSet, DoctorProfile, Document, PatientProfile};
pub use address::{derive_address, Address, Namespace, ADDRESS_CONTEXT};
pub use canonical::{decode_account, encode_account, encode_value, LAYOUT_VERSION};
pub use crypto::{Identity, Keypair, Signature};
pub use error::{CoreError, Result};
pub use types::{ContentAddress, Role, Salt, SALT_LEN};
