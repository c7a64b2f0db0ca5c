//! Grant and revoke transitions.
//!
//! Both sides of a share, the document's access list and the doctor's
//! profile, are staged in the same context so they commit together or not
//! at all.

use medledger_core::{Account, Address, DoctorProfile, Identity};
use medledger_store::AccountStore;

use crate::context::TxContext;
use crate::documents::{load_document, wrong_kind};
use crate::error::{RegistryError, Result};

async fn load_doctor_profile<S: AccountStore + ?Sized>(
    ctx: &mut TxContext<'_, S>,
    doctor: &Identity,
) -> Result<Option<(Address, DoctorProfile)>> {
    let address = Address::doctor_profile(doctor);
    match ctx.get(&address).await? {
        Some(Account::DoctorProfile(p)) => Ok(Some((address, p))),
        Some(other) => Err(wrong_kind(address, other.kind())),
        None => Ok(None),
    }
}

/// Share `document` with `doctor`. Granting twice is a no-op.
pub async fn grant_access<S: AccountStore + ?Sized>(
    ctx: &mut TxContext<'_, S>,
    caller: Identity,
    doctor: Identity,
    document_address: Address,
) -> Result<()> {
    let mut document = load_document(ctx, &document_address).await?;
    if document.owner != caller {
        return Err(RegistryError::Unauthorized {
            caller,
            required: document.owner,
        });
    }

    let (profile_address, mut profile) = load_doctor_profile(ctx, &doctor)
        .await?
        .ok_or(RegistryError::NotFound(Address::doctor_profile(&doctor)))?;

    let added_to_document = document
        .access_list
        .insert(doctor)
        .map_err(|e| RegistryError::capacity_at(document_address, e))?;
    let added_to_profile = profile
        .documents
        .insert(document_address)
        .map_err(|e| RegistryError::capacity_at(profile_address, e))?;

    if added_to_document {
        ctx.put(document_address, Account::Document(document)).await?;
    }
    if added_to_profile {
        ctx.put(profile_address, Account::DoctorProfile(profile)).await?;
    }
    Ok(())
}

/// Stop sharing `document` with `doctor`. Revoking an identity that was
/// never granted is a no-op.
pub async fn revoke_access<S: AccountStore + ?Sized>(
    ctx: &mut TxContext<'_, S>,
    caller: Identity,
    doctor: Identity,
    document_address: Address,
) -> Result<()> {
    let mut document = load_document(ctx, &document_address).await?;
    if document.owner != caller {
        return Err(RegistryError::Unauthorized {
            caller,
            required: document.owner,
        });
    }

    if !document.access_list.remove(&doctor) {
        return Ok(());
    }
    ctx.put(document_address, Account::Document(document)).await?;

    let (profile_address, mut profile) = load_doctor_profile(ctx, &doctor)
        .await?
        .ok_or(RegistryError::NotFound(Address::doctor_profile(&doctor)))?;
    if profile.documents.remove(&document_address) {
        ctx.put(profile_address, Account::DoctorProfile(profile)).await?;
    }
    Ok(())
}
