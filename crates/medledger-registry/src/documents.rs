//! Profile and document lifecycle transitions.
//!
//! Each function stages its changes in a [`TxContext`] and returns without
//! touching the store. An `Err` leaves nothing behind.

use medledger_core::{
    Account, AccountKind, Address, BoundedSet, ContentAddress, DoctorProfile, Document, Identity,
    PatientProfile, Role, Salt,
};
use medledger_store::AccountStore;
use tracing::warn;

use crate::config::RegistryConfig;
use crate::context::TxContext;
use crate::error::{RegistryError, Result};

/// Allocate an empty profile for `owner` under `role`.
///
/// Re-initialising an existing profile fails with `AlreadyExists`.
pub async fn init_profile<S: AccountStore + ?Sized>(
    ctx: &mut TxContext<'_, S>,
    config: &RegistryConfig,
    owner: Identity,
    role: Role,
) -> Result<()> {
    let address = Address::profile(role, &owner);
    if ctx.get(&address).await?.is_some() {
        return Err(RegistryError::AlreadyExists(address));
    }

    let account = match role {
        Role::Patient => {
            Account::PatientProfile(PatientProfile::new(owner, config.profile_capacity))
        }
        Role::Doctor => {
            Account::DoctorProfile(DoctorProfile::new(owner, config.profile_capacity))
        }
    };
    ctx.put(address, account).await
}

/// Arguments of a document creation.
pub struct NewDocument<'a> {
    pub patient: Identity,
    pub content_address: &'a ContentAddress,
    pub title: &'a str,
    pub description: &'a str,
    pub salt: Salt,
}

/// Register a document owned by `patient` and list it in their profile.
pub async fn create_document<S: AccountStore + ?Sized>(
    ctx: &mut TxContext<'_, S>,
    config: &RegistryConfig,
    caller: Identity,
    new: NewDocument<'_>,
) -> Result<Address> {
    if caller != new.patient {
        return Err(RegistryError::Unauthorized {
            caller,
            required: new.patient,
        });
    }
    validate_document_args(config, new.content_address, new.title, new.description)?;

    let profile_address = Address::patient_profile(&new.patient);
    let mut profile = match ctx.get(&profile_address).await? {
        Some(Account::PatientProfile(p)) => p,
        Some(other) => return Err(wrong_kind(profile_address, other.kind())),
        None => return Err(RegistryError::NoPatientProfile(new.patient)),
    };

    let document_address = Address::document(&new.patient, new.content_address);
    if ctx.get(&document_address).await?.is_some() {
        return Err(RegistryError::AlreadyExists(document_address));
    }

    profile
        .documents
        .insert(document_address)
        .map_err(|e| RegistryError::capacity_at(profile_address, e))?;

    let document = Document {
        content_address: new.content_address.clone(),
        title: new.title.to_string(),
        description: new.description.to_string(),
        salt: new.salt,
        owner: new.patient,
        access_list: BoundedSet::with_capacity(config.access_list_capacity),
    };

    ctx.put(document_address, Account::Document(document)).await?;
    ctx.put(profile_address, Account::PatientProfile(profile)).await?;
    Ok(document_address)
}

/// Remove a document, unlist it from its owner's profile and from every
/// doctor profile it was shared with.
pub async fn delete_document<S: AccountStore + ?Sized>(
    ctx: &mut TxContext<'_, S>,
    caller: Identity,
    patient: Identity,
    content_address: &ContentAddress,
) -> Result<Address> {
    let document_address = Address::document(&patient, content_address);
    let document = load_document(ctx, &document_address).await?;
    if document.owner != caller {
        return Err(RegistryError::Unauthorized {
            caller,
            required: document.owner,
        });
    }

    let profile_address = Address::patient_profile(&document.owner);
    let mut profile = match ctx.get(&profile_address).await? {
        Some(Account::PatientProfile(p)) => p,
        Some(other) => return Err(wrong_kind(profile_address, other.kind())),
        None => return Err(RegistryError::NoPatientProfile(document.owner)),
    };
    profile.documents.remove(&document_address);
    ctx.put(profile_address, Account::PatientProfile(profile)).await?;

    for doctor in document.access_list.iter() {
        let doctor_address = Address::doctor_profile(doctor);
        match ctx.get(&doctor_address).await? {
            Some(Account::DoctorProfile(mut dp)) => {
                if dp.documents.remove(&document_address) {
                    ctx.put(doctor_address, Account::DoctorProfile(dp)).await?;
                }
            }
            Some(other) => warn!(
                document = %document_address,
                doctor = %doctor,
                kind = other.kind().as_str(),
                "granted doctor's profile slot holds another account kind"
            ),
            None => warn!(
                document = %document_address,
                doctor = %doctor,
                "granted doctor has no profile"
            ),
        }
    }

    ctx.delete(&document_address).await?;
    Ok(document_address)
}

/// Read a document account or fail `NotFound`.
pub(crate) async fn load_document<S: AccountStore + ?Sized>(
    ctx: &mut TxContext<'_, S>,
    address: &Address,
) -> Result<Document> {
    match ctx.get(address).await? {
        Some(Account::Document(doc)) => Ok(doc),
        Some(other) => Err(wrong_kind(*address, other.kind())),
        None => Err(RegistryError::NotFound(*address)),
    }
}

pub(crate) fn wrong_kind(address: Address, kind: AccountKind) -> RegistryError {
    RegistryError::InvalidArgument(format!(
        "account at {} is a {}",
        address,
        kind.as_str()
    ))
}

fn validate_document_args(
    config: &RegistryConfig,
    content_address: &ContentAddress,
    title: &str,
    description: &str,
) -> Result<()> {
    if content_address.is_empty() {
        return Err(RegistryError::InvalidArgument("content address is empty".into()));
    }
    if content_address.len() > config.max_content_address_len {
        return Err(RegistryError::InvalidArgument(format!(
            "content address longer than {} bytes",
            config.max_content_address_len
        )));
    }
    if title.len() > config.max_title_len {
        return Err(RegistryError::InvalidArgument(format!(
            "title longer than {} bytes",
            config.max_title_len
        )));
    }
    if description.len() > config.max_description_len {
        return Err(RegistryError::InvalidArgument(format!(
            "description longer than {} bytes",
            config.max_description_len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medledger_core::Keypair;
    use medledger_store::MemoryStore;

    async fn seeded_store(patient: Identity) -> MemoryStore {
        let store = MemoryStore::new();
        let mut ctx = TxContext::new(&store);
        init_profile(&mut ctx, &RegistryConfig::default(), patient, Role::Patient)
            .await
            .unwrap();
        store.commit(ctx.into_write_set()).await.unwrap();
        store
    }

    fn new_doc<'a>(patient: Identity, content: &'a ContentAddress) -> NewDocument<'a> {
        NewDocument {
            patient,
            content_address: content,
            title: "title",
            description: "",
            salt: Salt::from_bytes([0; 16]),
        }
    }

    #[tokio::test]
    async fn test_init_profile_twice_fails() {
        let patient = Keypair::from_seed(&[1; 32]).identity();
        let store = seeded_store(patient).await;

        let mut ctx = TxContext::new(&store);
        let err = init_profile(&mut ctx, &RegistryConfig::default(), patient, Role::Patient)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(_)));

        // Same identity may still hold the other role
        let mut ctx = TxContext::new(&store);
        init_profile(&mut ctx, &RegistryConfig::default(), patient, Role::Doctor)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_stages_document_and_profile() {
        let patient = Keypair::from_seed(&[1; 32]).identity();
        let store = seeded_store(patient).await;
        let content = ContentAddress::new("ipfs1").unwrap();

        let mut ctx = TxContext::new(&store);
        let config = RegistryConfig::default();
        let addr = create_document(&mut ctx, &config, patient, new_doc(patient, &content))
            .await
            .unwrap();
        assert_eq!(ctx.touched().len(), 2);
        store.commit(ctx.into_write_set()).await.unwrap();

        let doc = store.get(&addr).await.unwrap().unwrap().account;
        assert_eq!(doc.as_document().unwrap().owner, patient);
    }

    #[tokio::test]
    async fn test_create_rejects_long_title() {
        let patient = Keypair::from_seed(&[1; 32]).identity();
        let store = seeded_store(patient).await;
        let content = ContentAddress::new("ipfs1").unwrap();
        let long = "x".repeat(65);
        let mut new = new_doc(patient, &content);
        new.title = &long;

        let mut ctx = TxContext::new(&store);
        let err = create_document(&mut ctx, &RegistryConfig::default(), patient, new)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_create_respects_profile_capacity() {
        let patient = Keypair::from_seed(&[1; 32]).identity();
        let config = RegistryConfig {
            profile_capacity: 1,
            ..Default::default()
        };
        let store = MemoryStore::new();
        let mut ctx = TxContext::new(&store);
        init_profile(&mut ctx, &config, patient, Role::Patient).await.unwrap();
        store.commit(ctx.into_write_set()).await.unwrap();

        let first = ContentAddress::new("ipfs1").unwrap();
        let mut ctx = TxContext::new(&store);
        create_document(&mut ctx, &config, patient, new_doc(patient, &first))
            .await
            .unwrap();
        store.commit(ctx.into_write_set()).await.unwrap();

        let second = ContentAddress::new("ipfs2").unwrap();
        let mut ctx = TxContext::new(&store);
        let err = create_document(&mut ctx, &config, patient, new_doc(patient, &second))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CapacityExceeded { capacity: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_delete_skips_granted_doctor_without_profile() {
        let patient = Keypair::from_seed(&[1; 32]).identity();
        let ghost = Keypair::from_seed(&[2; 32]).identity();
        let store = seeded_store(patient).await;
        let content = ContentAddress::new("ipfs1").unwrap();
        let config = RegistryConfig::default();

        let mut ctx = TxContext::new(&store);
        let addr = create_document(&mut ctx, &config, patient, new_doc(patient, &content))
            .await
            .unwrap();
        store.commit(ctx.into_write_set()).await.unwrap();

        // Access list names an identity that never initialised a doctor profile
        let mut ctx = TxContext::new(&store);
        let mut doc = load_document(&mut ctx, &addr).await.unwrap();
        doc.access_list.insert(ghost).unwrap();
        ctx.put(addr, Account::Document(doc)).await.unwrap();
        store.commit(ctx.into_write_set()).await.unwrap();

        let mut ctx = TxContext::new(&store);
        delete_document(&mut ctx, patient, patient, &content)
            .await
            .unwrap();
        assert!(!ctx.touched().contains(&Address::doctor_profile(&ghost)));
        store.commit(ctx.into_write_set()).await.unwrap();

        assert!(store.get(&addr).await.unwrap().is_none());
        let profile = store
            .get(&Address::patient_profile(&patient))
            .await
            .unwrap()
            .unwrap()
            .account;
        assert!(profile.as_patient_profile().unwrap().documents.is_empty());
    }

    #[tokio::test]
    async fn test_failed_transition_leaves_store_untouched() {
        let patient = Keypair::from_seed(&[1; 32]).identity();
        let store = seeded_store(patient).await;
        let before = store.commit_seq().await.unwrap();

        let mut ctx = TxContext::new(&store);
        let missing = ContentAddress::new("nothing").unwrap();
        assert!(delete_document(&mut ctx, patient, patient, &missing).await.is_err());
        drop(ctx);

        assert_eq!(store.commit_seq().await.unwrap(), before);
    }
}
