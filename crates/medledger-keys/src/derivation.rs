//! Secret-free document key derivation.
//!
//! The owner regenerates a document's key on demand by signing a canonical
//! request message and hashing the signature:
//!
//! ```text
//! message = "medledger/document-key/v1\0" || CBOR{0: document_id, 1: file_name, 2: salt}
//! key     = BLAKE3-derive-key("medledger/document-key/v1", sign(message))
//! ```
//!
//! The salt is public and stored with the document, so the same signer can
//! always rebuild the same key, and two documents never share one.

use ciborium::value::Value;

use medledger_core::canonical::{encode_value, int_map};
use medledger_core::{Identity, Salt};

use crate::crypto::DocumentKey;
use crate::error::Result;
use crate::signer::Signer;

/// Domain separator prefixed to every key request message.
pub const KEY_MESSAGE_DOMAIN: &[u8] = b"medledger/document-key/v1\0";

/// Inputs that identify one document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    pub document_id: Vec<u8>,
    pub file_name: String,
    pub salt: Salt,
}

impl KeyRequest {
    pub fn new(document_id: impl Into<Vec<u8>>, file_name: impl Into<String>, salt: Salt) -> Self {
        Self {
            document_id: document_id.into(),
            file_name: file_name.into(),
            salt,
        }
    }

    /// A request keyed by the owner's identity.
    ///
    /// The content address is unknown until the blob is encrypted, so the
    /// owner identity stands in as the document id and the salt carries the
    /// per-document uniqueness.
    pub fn for_owner(owner: &Identity, file_name: impl Into<String>, salt: Salt) -> Self {
        Self::new(owner.as_bytes().to_vec(), file_name, salt)
    }

    /// The exact bytes handed to the signer.
    pub fn canonical_message(&self) -> Vec<u8> {
        let map = int_map(vec![
            (0, Value::Bytes(self.document_id.clone())),
            (1, Value::Text(self.file_name.clone())),
            (2, Value::Bytes(self.salt.as_bytes().to_vec())),
        ]);

        let mut message = KEY_MESSAGE_DOMAIN.to_vec();
        message.extend_from_slice(&encode_value(&map));
        message
    }
}

/// Ask `signer` to sign the request and derive the document key from the
/// signature.
pub fn derive_document_key<S: Signer + ?Sized>(
    signer: &S,
    request: &KeyRequest,
) -> Result<DocumentKey> {
    let signature = signer.sign(&request.canonical_message())?;
    DocumentKey::from_signature(&signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KeyError;
    use medledger_core::Keypair;
    use proptest::prelude::*;

    struct RefusingSigner;

    impl Signer for RefusingSigner {
        fn identity(&self) -> Identity {
            Identity::from_bytes([0; 32])
        }

        fn sign(&self, _message: &[u8]) -> Result<Vec<u8>> {
            Err(KeyError::SigningFailed("user rejected".into()))
        }
    }

    struct EmptySigner;

    impl Signer for EmptySigner {
        fn identity(&self) -> Identity {
            Identity::from_bytes([0; 32])
        }

        fn sign(&self, _message: &[u8]) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_message_is_domain_separated_and_stable() {
        let request = KeyRequest::new(b"doc".to_vec(), "scan.pdf", Salt::from_bytes([1; 16]));
        let message = request.canonical_message();
        assert!(message.starts_with(KEY_MESSAGE_DOMAIN));
        assert_eq!(message, request.clone().canonical_message());
    }

    #[test]
    fn test_fields_do_not_run_together() {
        let salt = Salt::from_bytes([1; 16]);
        let a = KeyRequest::new(b"ab".to_vec(), "c", salt);
        let b = KeyRequest::new(b"a".to_vec(), "bc", salt);
        assert_ne!(a.canonical_message(), b.canonical_message());
    }

    #[test]
    fn test_signing_failure_propagates() {
        let request = KeyRequest::new(b"doc".to_vec(), "f", Salt::from_bytes([0; 16]));
        assert!(matches!(
            derive_document_key(&RefusingSigner, &request),
            Err(KeyError::SigningFailed(_))
        ));
        assert!(matches!(
            derive_document_key(&EmptySigner, &request),
            Err(KeyError::EmptySignature)
        ));
    }

    #[test]
    fn test_different_signers_get_different_keys() {
        let request = KeyRequest::new(b"doc".to_vec(), "f", Salt::from_bytes([0; 16]));
        let a = derive_document_key(&Keypair::from_seed(&[1; 32]), &request).unwrap();
        let b = derive_document_key(&Keypair::from_seed(&[2; 32]), &request).unwrap();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(
            seed in any::<[u8; 32]>(),
            doc in prop::collection::vec(any::<u8>(), 0..64),
            name in "[a-zA-Z0-9_.-]{1,32}",
            salt in any::<[u8; 16]>(),
        ) {
            let keypair = Keypair::from_seed(&seed);
            let request = KeyRequest::new(doc, name, Salt::from_bytes(salt));
            let k1 = derive_document_key(&keypair, &request).unwrap();
            let k2 = derive_document_key(&keypair, &request).unwrap();
            prop_assert_eq!(k1, k2);
        }

        #[test]
        fn salt_changes_key(
            seed in any::<[u8; 32]>(),
            salt_a in any::<[u8; 16]>(),
            salt_b in any::<[u8; 16]>(),
        ) {
            prop_assume!(salt_a != salt_b);
            let keypair = Keypair::from_seed(&seed);
            let owner = keypair.identity();
            let a = derive_document_key(&keypair, &KeyRequest::for_owner(&owner, "f", Salt::from_bytes(salt_a))).unwrap();
            let b = derive_document_key(&keypair, &KeyRequest::for_owner(&owner, "f", Salt::from_bytes(salt_b))).unwrap();
            prop_assert_ne!(a, b);
        }
    }
}
