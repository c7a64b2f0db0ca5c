//! Key sharing via X25519 key agreement.
//!
//! Granting access on the ledger only records who may view a document. The
//! owner hands the document key itself to the doctor off-ledger as a
//! [`KeyShare`], encrypted to the doctor's X25519 public key.

use serde::{Deserialize, Serialize};

use medledger_core::Address;

use crate::crypto::{
    DocumentKey, EncryptionNonce, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret,
};
use crate::error::{KeyError, Result};

/// A document key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    /// The document this key unlocks.
    pub document: Address,

    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// The document key, encrypted with the derived shared secret.
    pub encrypted_key: Vec<u8>,

    /// Nonce used for encryption.
    pub nonce: EncryptionNonce,
}

impl KeyShare {
    /// Wrap `key` for the holder of `recipient_public`.
    pub fn create(
        document: Address,
        key: &DocumentKey,
        recipient_public: &X25519PublicKey,
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let shared = ephemeral.diffie_hellman(recipient_public);

        // Binding the document address means a share cannot be replayed
        // as the key of another document.
        let wrap_key = shared.derive_wrapping_key(document.as_bytes());

        let nonce = EncryptionNonce::generate();
        let encrypted_key = wrap_key.encrypt(key.as_bytes(), &nonce)?;

        Ok(Self {
            document,
            ephemeral_public,
            encrypted_key,
            nonce,
        })
    }

    /// Unwrap the document key with the recipient's secret.
    pub fn open(&self, recipient_secret: &X25519StaticSecret) -> Result<DocumentKey> {
        let shared = recipient_secret.diffie_hellman(&self.ephemeral_public);
        let wrap_key = shared.derive_wrapping_key(self.document.as_bytes());

        let key_bytes = wrap_key.decrypt(&self.encrypted_key, &self.nonce)?;
        let arr: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            KeyError::DecryptionError(format!(
                "invalid key length: expected 32, got {}",
                key_bytes.len()
            ))
        })?;
        Ok(DocumentKey::from_bytes(arr))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| KeyError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyshare_roundtrip() {
        let recipient_secret = X25519StaticSecret::generate();
        let recipient_public = recipient_secret.public_key();
        let key = DocumentKey::generate();

        let share = KeyShare::create(Address::from_bytes([0x42; 32]), &key, &recipient_public)
            .unwrap();
        let recovered = KeyShare::from_bytes(&share.to_bytes()).unwrap();

        assert_eq!(recovered.open(&recipient_secret).unwrap(), key);
    }

    #[test]
    fn test_keyshare_wrong_recipient_fails() {
        let recipient_public = X25519StaticSecret::generate().public_key();
        let wrong_secret = X25519StaticSecret::generate();

        let share = KeyShare::create(
            Address::from_bytes([0x42; 32]),
            &DocumentKey::generate(),
            &recipient_public,
        )
        .unwrap();
        assert!(share.open(&wrong_secret).is_err());
    }

    #[test]
    fn test_keyshare_bound_to_document() {
        let recipient_secret = X25519StaticSecret::generate();
        let mut share = KeyShare::create(
            Address::from_bytes([0x01; 32]),
            &DocumentKey::generate(),
            &recipient_secret.public_key(),
        )
        .unwrap();
        share.document = Address::from_bytes([0x02; 32]);
        assert!(share.open(&recipient_secret).is_err());
    }
}
