//! The Vault: client pipeline over the registry and a content store.
//!
//! Upload: salt, derive key, seal, store blob, register document.
//! Download: read document, re-derive key from the stored salt, fetch,
//! decrypt.
//!
//! Every ledger mutation is signed through the same [`Signer`] that derives
//! document keys, so a vault never holds secret key material itself.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use medledger_core::{Address, ContentAddress, Document, Identity, Role, Salt, Signature};
use medledger_keys::{
    derive_document_key, DocumentKey, KeyRequest, KeyShare, SealedBlob, Signer, X25519PublicKey,
    X25519StaticSecret,
};
use medledger_registry::{Instruction, Receipt, Registry, RegistryError, SignedTransaction};
use medledger_store::AccountStore;

use crate::config::VaultConfig;
use crate::content::{verify_content, BlobMetadata, ContentStore};
use crate::error::{Result, VaultError};

/// A file to encrypt and register.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub title: String,
    pub description: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct Uploaded {
    /// Address of the registered document.
    pub document: Address,
    /// Where the sealed blob is stored.
    pub content_address: ContentAddress,
    /// Salt recorded with the document.
    pub salt: Salt,
    /// Receipt of the `create_document` transaction.
    pub receipt: Receipt,
}

/// A decrypted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Encrypted document vault.
pub struct Vault<S: AccountStore, C: ContentStore> {
    registry: Registry<S>,
    content: Arc<C>,
    config: VaultConfig,
}

impl<S: AccountStore, C: ContentStore> Vault<S, C> {
    /// Create a vault over an account store and a content store.
    pub fn new(store: S, content: C, config: VaultConfig) -> Result<Self> {
        Self::with_shared(Arc::new(store), Arc::new(content), config)
    }

    /// Create a vault over stores shared with other components.
    pub fn with_shared(store: Arc<S>, content: Arc<C>, config: VaultConfig) -> Result<Self> {
        config.registry.validate()?;
        Ok(Self {
            registry: Registry::with_shared_store(store, config.registry.clone()),
            content,
            config,
        })
    }

    /// The underlying registry, for queries.
    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// The underlying content store.
    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign `instruction` with `signer` and execute it.
    ///
    /// A signer that refuses aborts the operation before anything reaches
    /// the registry.
    pub async fn submit<G: Signer + ?Sized>(
        &self,
        signer: &G,
        instruction: Instruction,
    ) -> Result<Receipt> {
        let identity = signer.identity();
        let raw = signer.sign(&instruction.signing_bytes(&identity))?;
        let signature = Signature::try_from(raw.as_slice())?;
        let tx = SignedTransaction::new(identity, instruction, signature);
        Ok(self.registry.execute(&tx).await?)
    }

    /// Create the signer's profile under `role`.
    pub async fn init_profile<G: Signer + ?Sized>(&self, signer: &G, role: Role) -> Result<Receipt> {
        self.submit(signer, Instruction::InitProfile { role }).await
    }

    /// Share a document owned by the signer with `doctor`.
    pub async fn grant_access<G: Signer + ?Sized>(
        &self,
        signer: &G,
        doctor: Identity,
        document: Address,
    ) -> Result<Receipt> {
        self.submit(signer, Instruction::GrantAccess { doctor, document })
            .await
    }

    /// Stop sharing a document owned by the signer with `doctor`.
    pub async fn revoke_access<G: Signer + ?Sized>(
        &self,
        signer: &G,
        doctor: Identity,
        document: Address,
    ) -> Result<Receipt> {
        self.submit(signer, Instruction::RevokeAccess { doctor, document })
            .await
    }

    /// Delete a document owned by the signer.
    ///
    /// The sealed blob stays in the content store; without a registry entry
    /// its salt is gone and the key cannot be re-derived.
    pub async fn delete<G: Signer + ?Sized>(&self, signer: &G, document: &Address) -> Result<Receipt> {
        let doc = self.registry.document(document).await?;
        self.submit(
            signer,
            Instruction::DeleteDocument {
                patient: doc.owner,
                content_address: doc.content_address,
            },
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Upload / Download
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt a file, store it and register it as a document of the signer.
    pub async fn upload<G: Signer + ?Sized>(
        &self,
        signer: &G,
        request: UploadRequest,
    ) -> Result<Uploaded> {
        if request.file_name.is_empty() {
            return Err(VaultError::InvalidRequest("file name must not be empty".into()));
        }

        let owner = signer.identity();
        let salt = Salt::generate();
        let key = derive_document_key(
            signer,
            &KeyRequest::for_owner(&owner, request.file_name.as_str(), salt),
        )?;

        let sealed = key.seal(&request.bytes)?;
        let metadata = BlobMetadata {
            file_name: request.file_name,
            content_type: request.content_type,
            original_size: request.bytes.len() as u64,
        };
        let content_address = self.content.put(sealed.to_bytes(), metadata).await?;
        debug!(owner = %owner, content_address = %content_address, "sealed blob stored");

        let receipt = self
            .submit(
                signer,
                Instruction::CreateDocument {
                    patient: owner,
                    content_address: content_address.clone(),
                    title: request.title,
                    description: request.description,
                    salt,
                },
            )
            .await
            .map_err(|e| {
                warn!(owner = %owner, content_address = %content_address, error = %e, "document registration failed after upload");
                e
            })?;

        let document = Address::document(&owner, &content_address);
        info!(owner = %owner, document = %document, "document uploaded");

        Ok(Uploaded {
            document,
            content_address,
            salt,
            receipt,
        })
    }

    /// Fetch and decrypt a document owned by the signer.
    pub async fn download<G: Signer + ?Sized>(
        &self,
        signer: &G,
        document: &Address,
    ) -> Result<Downloaded> {
        let doc = self.registry.document(document).await?;
        let caller = signer.identity();
        if doc.owner != caller {
            return Err(RegistryError::Unauthorized {
                caller,
                required: doc.owner,
            }
            .into());
        }

        let metadata = self.content.metadata(&doc.content_address).await?;
        let key = derive_document_key(
            signer,
            &KeyRequest::for_owner(&doc.owner, metadata.file_name.as_str(), doc.salt),
        )?;

        let bytes = self.open_blob(&doc, &key).await?;
        debug!(document = %document, "document downloaded");

        Ok(Downloaded {
            file_name: metadata.file_name,
            content_type: metadata.content_type,
            bytes,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key Sharing
    // ─────────────────────────────────────────────────────────────────────────

    /// Wrap a document's key for a viewer's X25519 public key.
    ///
    /// The share is handed to the viewer out of band. Access on the ledger
    /// still has to be granted separately.
    pub async fn share_key<G: Signer + ?Sized>(
        &self,
        signer: &G,
        document: &Address,
        recipient: &X25519PublicKey,
    ) -> Result<KeyShare> {
        let doc = self.registry.document(document).await?;
        let caller = signer.identity();
        if doc.owner != caller {
            return Err(RegistryError::Unauthorized {
                caller,
                required: doc.owner,
            }
            .into());
        }

        let metadata = self.content.metadata(&doc.content_address).await?;
        let key = derive_document_key(
            signer,
            &KeyRequest::for_owner(&doc.owner, metadata.file_name.as_str(), doc.salt),
        )?;
        Ok(KeyShare::create(*document, &key, recipient)?)
    }

    /// Fetch and decrypt a shared document as `viewer`.
    ///
    /// Fails with `Unauthorized` once the owner has revoked `viewer`, even
    /// if the viewer still holds a valid share.
    pub async fn open_shared(
        &self,
        viewer: &Identity,
        share: &KeyShare,
        secret: &X25519StaticSecret,
    ) -> Result<Downloaded> {
        let doc = self.registry.document(&share.document).await?;
        if !doc.is_viewable_by(viewer) {
            return Err(RegistryError::Unauthorized {
                caller: *viewer,
                required: doc.owner,
            }
            .into());
        }

        let key = share.open(secret)?;
        let metadata = self.content.metadata(&doc.content_address).await?;
        let bytes = self.open_blob(&doc, &key).await?;

        Ok(Downloaded {
            file_name: metadata.file_name,
            content_type: metadata.content_type,
            bytes,
        })
    }

    async fn open_blob(&self, doc: &Document, key: &DocumentKey) -> Result<Vec<u8>> {
        let blob = self.content.get(&doc.content_address).await?;
        if self.config.verify_content_address {
            verify_content(&doc.content_address, &blob)?;
        }
        let sealed = SealedBlob::from_bytes(&blob)?;
        Ok(key.open(&sealed)?)
    }
}
