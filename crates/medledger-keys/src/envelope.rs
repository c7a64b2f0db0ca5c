//! Sealed blob envelope.
//!
//! An encrypted document is stored as one opaque byte string:
//!
//! ```text
//! format (1 byte) || nonce (12 bytes) || ciphertext with tag
//! ```
//!
//! The content store only ever sees these bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::crypto::{DocumentKey, EncryptionNonce};
use crate::error::{KeyError, Result};

/// Format identifier for sealed blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

impl EncryptionFormat {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// Authentication tag length of ChaCha20-Poly1305.
const TAG_LEN: usize = 16;

const HEADER_LEN: usize = 1 + EncryptionNonce::LEN;

/// An encrypted document ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBlob {
    /// Encryption algorithm used.
    pub format: EncryptionFormat,

    /// Nonce used for encryption (unique per encryption).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Bytes,
}

impl SealedBlob {
    /// Serialize to the stored layout.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.ciphertext.len());
        buf.put_u8(self.format as u8);
        buf.put_slice(self.nonce.as_bytes());
        buf.put_slice(&self.ciphertext);
        buf.freeze()
    }

    /// Parse the stored layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN + TAG_LEN {
            return Err(KeyError::MalformedBlob(format!(
                "{} bytes is shorter than the minimum {}",
                bytes.len(),
                HEADER_LEN + TAG_LEN
            )));
        }

        let format = EncryptionFormat::from_u8(bytes[0])
            .ok_or_else(|| KeyError::MalformedBlob(format!("unknown format {}", bytes[0])))?;
        let mut nonce = [0u8; EncryptionNonce::LEN];
        nonce.copy_from_slice(&bytes[1..HEADER_LEN]);

        Ok(Self {
            format,
            nonce: EncryptionNonce::from_bytes(nonce),
            ciphertext: Bytes::copy_from_slice(&bytes[HEADER_LEN..]),
        })
    }

    /// Get the size of the ciphertext.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

impl DocumentKey {
    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedBlob> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = self.encrypt(plaintext, &nonce)?;

        Ok(SealedBlob {
            format: EncryptionFormat::ChaCha20Poly1305,
            nonce,
            ciphertext: Bytes::from(ciphertext),
        })
    }

    /// Decrypt and authenticate a sealed blob.
    pub fn open(&self, sealed: &SealedBlob) -> Result<Vec<u8>> {
        match sealed.format {
            EncryptionFormat::ChaCha20Poly1305 => self.decrypt(&sealed.ciphertext, &sealed.nonce),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = DocumentKey::generate();
        let plaintext = b"hello, encrypted world!";

        let sealed = key.seal(plaintext).unwrap();
        let parsed = SealedBlob::from_bytes(&sealed.to_bytes()).unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(key.open(&parsed).unwrap(), plaintext);
    }

    #[test]
    fn test_nonce_is_fresh_per_seal() {
        let key = DocumentKey::generate();
        let a = key.seal(b"same").unwrap();
        let b = key.seal(b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = DocumentKey::generate().seal(b"secret").unwrap();
        assert!(matches!(
            DocumentKey::generate().open(&sealed),
            Err(KeyError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = DocumentKey::generate();
        let mut bytes = key.seal(b"secret").unwrap().to_bytes().to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let sealed = SealedBlob::from_bytes(&bytes).unwrap();
        assert!(key.open(&sealed).is_err());
    }

    #[test]
    fn test_malformed_layouts() {
        assert!(SealedBlob::from_bytes(&[1u8; 5]).is_err());
        let mut bytes = DocumentKey::generate().seal(b"x").unwrap().to_bytes().to_vec();
        bytes[0] = 9;
        assert!(matches!(
            SealedBlob::from_bytes(&bytes),
            Err(KeyError::MalformedBlob(_))
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = DocumentKey::generate();
        let sealed = key.seal(b"").unwrap();
        assert_eq!(sealed.ciphertext_len(), TAG_LEN);
        assert!(key.open(&SealedBlob::from_bytes(&sealed.to_bytes()).unwrap()).unwrap().is_empty());
    }
}
