//! Content store: where sealed blobs live.
//!
//! The registry only records a [`ContentAddress`]. The encrypted bytes are
//! kept in a content-addressed store whose addresses are
//! `b3:` followed by the hex BLAKE3 digest of the stored bytes. Stores only
//! ever see ciphertext.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use medledger_core::ContentAddress;

use crate::error::{Result, VaultError};

/// Prefix of every content address this crate produces.
pub const CONTENT_ADDRESS_PREFIX: &str = "b3:";

/// Descriptive metadata kept beside a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// Original file name. Needed to re-derive the document key.
    pub file_name: String,
    /// MIME type of the plaintext.
    pub content_type: String,
    /// Plaintext size in bytes.
    pub original_size: u64,
}

/// Compute the content address of `data`.
pub fn content_address_of(data: &[u8]) -> Result<ContentAddress> {
    let digest = blake3::hash(data);
    Ok(ContentAddress::new(format!(
        "{}{}",
        CONTENT_ADDRESS_PREFIX,
        digest.to_hex()
    ))?)
}

/// Parse the digest out of a `b3:` content address.
pub fn digest_of(address: &ContentAddress) -> Result<blake3::Hash> {
    address
        .as_str()
        .strip_prefix(CONTENT_ADDRESS_PREFIX)
        .and_then(|hex| blake3::Hash::from_hex(hex).ok())
        .ok_or_else(|| VaultError::InvalidContentAddress(address.as_str().to_string()))
}

/// Check that `data` hashes to `address`.
pub fn verify_content(address: &ContentAddress, data: &[u8]) -> Result<()> {
    let expected = digest_of(address)?;
    if blake3::hash(data) != expected {
        return Err(VaultError::ContentMismatch {
            expected: address.clone(),
            actual: content_address_of(data)?,
        });
    }
    Ok(())
}

/// A content-addressed blob store.
///
/// `put` is idempotent: storing the same bytes twice yields the same
/// address and keeps the first metadata.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `data` and return its address.
    async fn put(&self, data: Bytes, metadata: BlobMetadata) -> Result<ContentAddress>;

    /// Fetch the bytes stored at `address`.
    ///
    /// Fails with [`VaultError::ContentNotFound`] if absent and
    /// [`VaultError::ContentMismatch`] if the bytes do not hash to `address`.
    async fn get(&self, address: &ContentAddress) -> Result<Bytes>;

    /// Fetch the metadata recorded with the blob.
    async fn metadata(&self, address: &ContentAddress) -> Result<BlobMetadata>;

    /// Check whether a blob is stored at `address`.
    async fn exists(&self, address: &ContentAddress) -> Result<bool>;
}

/// In-memory content store for testing and simple use cases.
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentAddress, (Bytes, BlobMetadata)>>,
}

impl MemoryContentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: Bytes, metadata: BlobMetadata) -> Result<ContentAddress> {
        let address = content_address_of(&data)?;
        self.blobs
            .write()
            .unwrap()
            .entry(address.clone())
            .or_insert((data, metadata));
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes> {
        let data = self
            .blobs
            .read()
            .unwrap()
            .get(address)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| VaultError::ContentNotFound(address.clone()))?;
        verify_content(address, &data)?;
        Ok(data)
    }

    async fn metadata(&self, address: &ContentAddress) -> Result<BlobMetadata> {
        self.blobs
            .read()
            .unwrap()
            .get(address)
            .map(|(_, metadata)| metadata.clone())
            .ok_or_else(|| VaultError::ContentNotFound(address.clone()))
    }

    async fn exists(&self, address: &ContentAddress) -> Result<bool> {
        Ok(self.blobs.read().unwrap().contains_key(address))
    }
}
