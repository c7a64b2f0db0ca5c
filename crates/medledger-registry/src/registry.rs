//! The Registry: executes signed instructions and answers queries.

use std::sync::Arc;

use medledger_core::{
    Account, Address, DoctorProfile, Document, Identity, Keypair, PatientProfile, Role,
};
use medledger_store::AccountStore;
use tracing::{debug, info, warn};

use crate::access;
use crate::config::RegistryConfig;
use crate::context::TxContext;
use crate::documents::{self, wrong_kind, NewDocument};
use crate::error::{RegistryError, Result};
use crate::instruction::{Instruction, SignedTransaction};

/// Outcome of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Name of the executed instruction.
    pub instruction: &'static str,
    /// Verified caller.
    pub signer: Identity,
    /// Commit sequence the changes landed at.
    pub commit_seq: u64,
    /// Accounts whose state changed, in address order.
    pub touched: Vec<Address>,
}

impl Receipt {
    /// Whether the transaction changed nothing (idempotent grant or revoke).
    pub fn is_noop(&self) -> bool {
        self.touched.is_empty()
    }
}

/// The document registry and access controller.
///
/// Every mutation is a [`SignedTransaction`]. Execution stages the whole
/// transition and commits it with one store call; a conflicting concurrent
/// commit surfaces as [`RegistryError::Conflict`] and the caller decides
/// whether to resubmit.
pub struct Registry<S: AccountStore> {
    store: Arc<S>,
    config: RegistryConfig,
}

impl<S: AccountStore> Registry<S> {
    /// Create a registry over a store.
    pub fn new(store: S, config: RegistryConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a registry over a store shared with other components.
    pub fn with_shared_store(store: Arc<S>, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Verify, run and commit a transaction.
    pub async fn execute(&self, tx: &SignedTransaction) -> Result<Receipt> {
        let name = tx.instruction.name();
        let signer = tx.signer;

        if let Err(e) = tx.verify() {
            warn!(instruction = name, signer = %signer, "rejected transaction with bad signature");
            return Err(e);
        }
        debug!(instruction = name, signer = %signer, "executing transaction");

        let mut ctx = TxContext::new(self.store.as_ref());
        ctx.prefetch(&tx.instruction.accounts(&signer)).await?;

        if let Err(e) = self.apply(&mut ctx, signer, &tx.instruction).await {
            debug!(instruction = name, signer = %signer, error = e.kind(), "transaction aborted");
            return Err(e);
        }

        let touched = ctx.touched();
        let commit_seq = match self.store.commit(ctx.into_write_set()).await {
            Ok(seq) => seq,
            Err(e) => {
                let err = RegistryError::from(e);
                if err.is_retryable() {
                    warn!(instruction = name, signer = %signer, "transaction conflicted with a concurrent commit");
                }
                return Err(err);
            }
        };

        info!(
            instruction = name,
            signer = %signer,
            commit_seq,
            touched = touched.len(),
            "transaction committed"
        );

        Ok(Receipt {
            instruction: name,
            signer,
            commit_seq,
            touched,
        })
    }

    /// Sign an instruction with a local keypair and execute it.
    pub async fn submit(&self, keypair: &Keypair, instruction: Instruction) -> Result<Receipt> {
        self.execute(&SignedTransaction::sign(keypair, instruction))
            .await
    }

    async fn apply(
        &self,
        ctx: &mut TxContext<'_, S>,
        signer: Identity,
        instruction: &Instruction,
    ) -> Result<()> {
        match instruction {
            Instruction::InitProfile { role } => {
                documents::init_profile(ctx, &self.config, signer, *role).await
            }
            Instruction::CreateDocument {
                patient,
                content_address,
                title,
                description,
                salt,
            } => {
                let new = NewDocument {
                    patient: *patient,
                    content_address,
                    title,
                    description,
                    salt: *salt,
                };
                documents::create_document(ctx, &self.config, signer, new)
                    .await
                    .map(|_| ())
            }
            Instruction::DeleteDocument {
                patient,
                content_address,
            } => documents::delete_document(ctx, signer, *patient, content_address)
                .await
                .map(|_| ()),
            Instruction::GrantAccess { doctor, document } => {
                access::grant_access(ctx, signer, *doctor, *document).await
            }
            Instruction::RevokeAccess { doctor, document } => {
                access::revoke_access(ctx, signer, *doctor, *document).await
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    async fn account(&self, address: &Address) -> Result<Account> {
        self.store
            .get(address)
            .await?
            .map(|s| s.account)
            .ok_or(RegistryError::NotFound(*address))
    }

    /// The patient profile of `patient`.
    pub async fn patient_profile(&self, patient: &Identity) -> Result<PatientProfile> {
        let address = Address::patient_profile(patient);
        match self.account(&address).await? {
            Account::PatientProfile(p) => Ok(p),
            other => Err(wrong_kind(address, other.kind())),
        }
    }

    /// The doctor profile of `doctor`.
    pub async fn doctor_profile(&self, doctor: &Identity) -> Result<DoctorProfile> {
        let address = Address::doctor_profile(doctor);
        match self.account(&address).await? {
            Account::DoctorProfile(p) => Ok(p),
            other => Err(wrong_kind(address, other.kind())),
        }
    }

    /// Whether a profile exists for `identity` under `role`.
    pub async fn has_profile(&self, role: Role, identity: &Identity) -> Result<bool> {
        Ok(self
            .store
            .get(&Address::profile(role, identity))
            .await?
            .is_some())
    }

    /// The document at `address`.
    pub async fn document(&self, address: &Address) -> Result<Document> {
        match self.account(address).await? {
            Account::Document(doc) => Ok(doc),
            other => Err(wrong_kind(*address, other.kind())),
        }
    }

    /// Documents owned by `patient`, in creation order.
    pub async fn documents_of_patient(&self, patient: &Identity) -> Result<Vec<Document>> {
        let profile = self.patient_profile(patient).await?;
        self.resolve(profile.documents.as_slice()).await
    }

    /// Documents shared with `doctor`, in grant order.
    pub async fn documents_shared_with(&self, doctor: &Identity) -> Result<Vec<Document>> {
        let profile = self.doctor_profile(doctor).await?;
        self.resolve(profile.documents.as_slice()).await
    }

    /// Whether `identity` owns or has been granted the document.
    pub async fn can_view(&self, identity: &Identity, document: &Address) -> Result<bool> {
        Ok(self.document(document).await?.is_viewable_by(identity))
    }

    async fn resolve(&self, addresses: &[Address]) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(addresses.len());
        for address in addresses {
            docs.push(self.document(address).await?);
        }
        Ok(docs)
    }
}
