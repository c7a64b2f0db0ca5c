//! Directory-backed content store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <hex digest>          sealed blob bytes
//! <hex digest>.json     BlobMetadata
//! ```
//!
//! Files are written to a temporary name and renamed into place, so a
//! reader never sees a partially written blob.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use medledger_core::ContentAddress;

use crate::content::{content_address_of, digest_of, verify_content, BlobMetadata, ContentStore};
use crate::error::{Result, VaultError};

/// Content store that keeps one file per blob in a directory.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The directory blobs are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob file for `address`.
    ///
    /// Only well-formed `b3:` addresses map to a path, so an address can
    /// never point outside the root.
    pub fn blob_path(&self, address: &ContentAddress) -> Result<PathBuf> {
        Ok(self.root.join(digest_of(address)?.to_hex().as_str()))
    }

    fn metadata_path(&self, address: &ContentAddress) -> Result<PathBuf> {
        Ok(self
            .root
            .join(format!("{}.json", digest_of(address)?.to_hex())))
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn not_found(address: &ContentAddress) -> impl FnOnce(std::io::Error) -> VaultError + '_ {
    move |e| {
        if e.kind() == ErrorKind::NotFound {
            VaultError::ContentNotFound(address.clone())
        } else {
            VaultError::Io(e)
        }
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn put(&self, data: Bytes, metadata: BlobMetadata) -> Result<ContentAddress> {
        let address = content_address_of(&data)?;
        let blob_path = self.blob_path(&address)?;

        if fs::try_exists(&blob_path).await? {
            debug!(address = %address, "blob already stored");
            return Ok(address);
        }

        // Metadata first: a blob file is only visible once its metadata is.
        let meta_path = self.metadata_path(&address)?;
        Self::write_atomic(&meta_path, &serde_json::to_vec(&metadata)?).await?;
        Self::write_atomic(&blob_path, &data).await?;

        debug!(address = %address, size = data.len(), "stored blob");
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes> {
        let data = fs::read(self.blob_path(address)?)
            .await
            .map_err(not_found(address))?;
        verify_content(address, &data)?;
        Ok(Bytes::from(data))
    }

    async fn metadata(&self, address: &ContentAddress) -> Result<BlobMetadata> {
        let raw = fs::read(self.metadata_path(address)?)
            .await
            .map_err(not_found(address))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn exists(&self, address: &ContentAddress) -> Result<bool> {
        Ok(fs::try_exists(self.blob_path(address)?).await?)
    }
}
