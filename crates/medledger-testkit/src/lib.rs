//! # Medledger Testkit
//!
//! Testing utilities for medledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed inputs with expected bytes for the
//!   persisted account layout and key-derivation messages
//! - **Generators**: Proptest strategies for identities, addresses and
//!   document parameters
//! - **Fixtures**: Deterministic parties and in-memory registries
//!
//! ## Golden Vectors
//!
//! ```rust
//! use medledger_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, hex) in verify_all_vectors() {
//!     assert!(ok, "{name}: {hex}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use medledger_testkit::generators::DocumentParams;
//!
//! proptest! {
//!     #[test]
//!     fn document_address_is_deterministic(params: DocumentParams) {
//!         prop_assert_eq!(params.document_address(), params.document_address());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use medledger_testkit::fixtures::TestFixture;
//!
//! let patient = TestFixture::with_seed([1; 32]);
//! let tx = patient.create_document("lab-results");
//! assert!(tx.verify().is_ok());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{
    init_tracing, memory_registry, memory_registry_with, multi_party_fixtures, TestFixture,
};
pub use generators::DocumentParams;
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
