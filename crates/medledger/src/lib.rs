//! # Medledger
//!
//! An access-controlled registry for encrypted medical documents.
//!
//! ## Overview
//!
//! Medledger lets a patient register encrypted documents on a shared
//! ledger and decide which doctors may view them:
//!
//! - **Registry**: Patient and doctor profiles, documents and their access
//!   lists, stored as accounts at derived addresses
//! - **Access control**: Grant and revoke keep the document's access list
//!   and the doctor's profile in agreement, atomically
//! - **Keys**: Document keys are re-derived from a signature and never
//!   stored anywhere
//! - **Content**: Sealed blobs live in a content-addressed store outside
//!   the ledger
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use medledger::{MemoryContentStore, UploadRequest, Vault, VaultConfig};
//! use medledger::core::{Keypair, Role};
//! use medledger::store::SqliteStore;
//!
//! async fn example() {
//!     let patient = Keypair::generate();
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let vault = Vault::new(store, MemoryContentStore::new(), VaultConfig::default()).unwrap();
//!
//!     vault.init_profile(&patient, Role::Patient).await.unwrap();
//!
//!     let uploaded = vault
//!         .upload(
//!             &patient,
//!             UploadRequest {
//!                 file_name: "xray.png".into(),
//!                 title: "Chest X-ray".into(),
//!                 description: "March follow-up".into(),
//!                 content_type: "image/png".into(),
//!                 bytes: Bytes::from_static(b"..."),
//!             },
//!         )
//!         .await
//!         .unwrap();
//!
//!     let file = vault.download(&patient, &uploaded.document).await.unwrap();
//!     assert_eq!(file.file_name, "xray.png");
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `medledger::core` - Identities, addresses and account layouts
//! - `medledger::store` - Account store abstraction and SQLite
//! - `medledger::registry` - Instruction execution and queries
//! - `medledger::keys` - Key derivation, sealing and key shares

pub mod config;
pub mod content;
pub mod error;
pub mod local;
pub mod vault;

// Re-export component crates
pub use medledger_core as core;
pub use medledger_keys as keys;
pub use medledger_registry as registry;
pub use medledger_store as store;

// Re-export main types for convenience
pub use config::VaultConfig;
pub use content::{
    content_address_of, BlobMetadata, ContentStore, MemoryContentStore, CONTENT_ADDRESS_PREFIX,
};
pub use error::{Result, VaultError};
pub use local::LocalContentStore;
pub use vault::{Downloaded, UploadRequest, Uploaded, Vault};

// Re-export commonly used types
pub use medledger_core::{Address, ContentAddress, Identity, Keypair, Role, Salt};
pub use medledger_keys::{KeyShare, Signer, X25519PublicKey, X25519StaticSecret};
pub use medledger_registry::{Instruction, Receipt, Registry, RegistryConfig, RegistryError};
