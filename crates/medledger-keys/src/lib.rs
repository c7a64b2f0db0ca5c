//! # Medledger Keys
//!
//! Client-side key derivation and blob encryption.
//!
//! ## Overview
//!
//! A document's symmetric key is never stored. The owner regenerates it by
//! signing a canonical [`KeyRequest`] and hashing the signature, so the key
//! is available to whoever holds the owner's signing capability and to
//! nobody else.
//!
//! ## Key Concepts
//!
//! - **Signer**: An opaque capability that signs bytes for an identity
//! - **KeyRequest**: `{document_id, file_name, salt}`, serialized canonically
//!   and domain-separated before signing
//! - **DocumentKey**: BLAKE3 digest of the signature, used with
//!   ChaCha20-Poly1305
//! - **SealedBlob**: The encrypted bytes handed to the content store
//! - **KeyShare**: A document key wrapped to a granted viewer's X25519 key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medledger_core::{Keypair, Salt};
//! use medledger_keys::{derive_document_key, KeyRequest};
//!
//! let owner = Keypair::generate();
//! let request = KeyRequest::for_owner(&owner.identity(), "scan.pdf", Salt::generate());
//! let key = derive_document_key(&owner, &request).unwrap();
//!
//! let sealed = key.seal(b"plaintext").unwrap();
//! assert_eq!(key.open(&sealed).unwrap(), b"plaintext");
//! ```

pub mod crypto;
pub mod derivation;
pub mod envelope;
pub mod error;
pub mod keyshare;
pub mod signer;

pub use crypto::{
    DocumentKey, EncryptionNonce, EphemeralKeyPair, SharedKey, X25519PublicKey,
    X25519StaticSecret, DOCUMENT_KEY_CONTEXT,
};
pub use derivation::{derive_document_key, KeyRequest, KEY_MESSAGE_DOMAIN};
pub use envelope::{EncryptionFormat, SealedBlob};
pub use error::{KeyError, Result};
pub use keyshare::KeyShare;
pub use signer::Signer;
