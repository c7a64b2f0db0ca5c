//! Cryptographic primitives for document keys.
//!
//! Provides the signature-derived [`DocumentKey`], ChaCha20-Poly1305
//! authenticated encryption, and X25519 key agreement for handing a key to
//! a granted viewer.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{KeyError, Result};

/// BLAKE3 context for turning a signature into a document key.
pub const DOCUMENT_KEY_CONTEXT: &str = "medledger/document-key/v1";

/// BLAKE3 context for turning an X25519 shared secret into a wrapping key.
pub const KEY_WRAP_CONTEXT: &str = "medledger/key-share/v1";

/// A 256-bit symmetric key for one document.
///
/// Never persisted and never serialized; regenerate it from a signature.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentKey([u8; 32]);

impl DocumentKey {
    /// Derive a key from signature bytes.
    ///
    /// The key is a one-way digest of the signature; the signature itself is
    /// never used as key material.
    pub fn from_signature(signature: &[u8]) -> Result<Self> {
        if signature.is_empty() {
            return Err(KeyError::EmptySignature);
        }
        Ok(Self(blake3::derive_key(DOCUMENT_KEY_CONTEXT, signature)))
    }

    /// Generate a random key, for content not bound to a signer.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| KeyError::EncryptionError(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| KeyError::EncryptionError(e.to_string()))
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| KeyError::DecryptionError(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce.0);
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| KeyError::DecryptionError(e.to_string()))
    }
}

impl fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocumentKey(..)")
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Length in bytes.
    pub const LEN: usize = 12;

    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// An X25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static secret key.
///
/// A viewer publishes the matching public key so owners can hand them
/// document keys out of band.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(StaticSecret::from(bytes))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

/// A shared secret derived from X25519 key agreement.
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Derive a wrapping key bound to `context`.
    pub fn derive_wrapping_key(&self, context: &[u8]) -> DocumentKey {
        let mut hasher = blake3::Hasher::new_derive_key(KEY_WRAP_CONTEXT);
        hasher.update(&self.0);
        hasher.update(context);
        DocumentKey(*hasher.finalize().as_bytes())
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret (can only be used once).
    pub fn diffie_hellman(self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_signature_is_not_the_signature() {
        let sig = [0x11u8; 64];
        let key = DocumentKey::from_signature(&sig).unwrap();
        assert_ne!(&key.as_bytes()[..], &sig[..32]);
        assert_eq!(key, DocumentKey::from_signature(&sig).unwrap());
    }

    #[test]
    fn test_empty_signature_rejected() {
        assert!(matches!(
            DocumentKey::from_signature(&[]),
            Err(KeyError::EmptySignature)
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let key = DocumentKey::from_bytes([0xab; 32]);
        assert_eq!(format!("{:?}", key), "DocumentKey(..)");
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = DocumentKey::generate();
        let nonce = EncryptionNonce::generate();
        let plaintext = b"hello, world!";

        let ciphertext = key.encrypt(plaintext, &nonce).unwrap();
        assert_ne!(ciphertext, plaintext);

        let decrypted = key.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = DocumentKey::generate();
        let key2 = DocumentKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key1.encrypt(b"secret", &nonce).unwrap();
        assert!(key2.decrypt(&ciphertext, &nonce).is_err());
    }

    #[test]
    fn test_ephemeral_key_agreement() {
        let bob_secret = X25519StaticSecret::generate();
        let bob_public = bob_secret.public_key();

        let alice_ephemeral = EphemeralKeyPair::generate();
        let alice_ephemeral_public = alice_ephemeral.public_key();
        let alice_shared = alice_ephemeral.diffie_hellman(&bob_public);
        let bob_shared = bob_secret.diffie_hellman(&alice_ephemeral_public);

        assert_eq!(
            alice_shared.derive_wrapping_key(b"ctx"),
            bob_shared.derive_wrapping_key(b"ctx")
        );
        assert_ne!(
            alice_shared.derive_wrapping_key(b"ctx-a"),
            alice_shared.derive_wrapping_key(b"ctx-b")
        );
    }
}
