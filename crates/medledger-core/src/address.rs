//! Derived account addresses.
//!
//! Every ledger account lives at an address computed from a namespace tag,
//! the owning identity, and optional extra bytes. Anyone can compute an
//! address without reading ledger state, and the transaction author and the
//! executing registry always arrive at the same bytes.
//!
//! Derivation is BLAKE3 in derive-key mode. Each field is length-prefixed so
//! that no two distinct `(namespace, owner, extra)` triples hash the same
//! input.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Identity;
use crate::types::{ContentAddress, Role};

/// BLAKE3 context string for address derivation.
pub const ADDRESS_CONTEXT: &str = "medledger 2024-06 account address v1";

/// Namespaces that partition the address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    PatientProfile,
    DoctorProfile,
    Document,
}

impl Namespace {
    /// The tag mixed into the derivation.
    pub const fn tag(self) -> &'static [u8] {
        match self {
            Namespace::PatientProfile => b"patient_profile",
            Namespace::DoctorProfile => b"doctor_profile",
            Namespace::Document => b"document",
        }
    }
}

impl From<Role> for Namespace {
    fn from(role: Role) -> Self {
        match role {
            Role::Patient => Namespace::PatientProfile,
            Role::Doctor => Namespace::DoctorProfile,
        }
    }
}

/// A 32-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

/// Derive an address from a namespace, owner identity and extra bytes.
pub fn derive_address(namespace: Namespace, owner: &Identity, extra: &[u8]) -> Address {
    let mut hasher = blake3::Hasher::new_derive_key(ADDRESS_CONTEXT);
    for field in [namespace.tag(), owner.as_bytes().as_slice(), extra] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    Address(*hasher.finalize().as_bytes())
}

impl Address {
    /// Address of the patient profile owned by `identity`.
    pub fn patient_profile(identity: &Identity) -> Self {
        derive_address(Namespace::PatientProfile, identity, &[])
    }

    /// Address of the doctor profile owned by `identity`.
    pub fn doctor_profile(identity: &Identity) -> Self {
        derive_address(Namespace::DoctorProfile, identity, &[])
    }

    /// Address of the profile for `identity` under `role`.
    pub fn profile(role: Role, identity: &Identity) -> Self {
        derive_address(role.into(), identity, &[])
    }

    /// Address of the document `patient` registered for `content`.
    pub fn document(patient: &Identity, content: &ContentAddress) -> Self {
        derive_address(Namespace::Document, patient, content.as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn test_derivation_is_reproducible() {
        let patient = Keypair::from_seed(&[7u8; 32]).identity();
        let content = ContentAddress::new("ipfs1").unwrap();

        assert_eq!(
            Address::document(&patient, &content),
            Address::document(&patient, &content)
        );
        assert_eq!(
            Address::patient_profile(&patient),
            Address::profile(Role::Patient, &patient)
        );
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let id = Keypair::from_seed(&[7u8; 32]).identity();
        assert_ne!(Address::patient_profile(&id), Address::doctor_profile(&id));
    }

    #[test]
    fn test_distinct_owners_and_contents() {
        let a = Keypair::from_seed(&[1u8; 32]).identity();
        let b = Keypair::from_seed(&[2u8; 32]).identity();
        let c1 = ContentAddress::new("ipfs1").unwrap();
        let c2 = ContentAddress::new("ipfs2").unwrap();

        assert_ne!(Address::document(&a, &c1), Address::document(&b, &c1));
        assert_ne!(Address::document(&a, &c1), Address::document(&a, &c2));
    }

    #[test]
    fn test_length_prefix_prevents_field_shifting() {
        let owner = Identity::from_bytes([0u8; 32]);
        let x = derive_address(Namespace::Document, &owner, b"ab");
        let y = derive_address(Namespace::Document, &owner, b"a");
        assert_ne!(x, y);
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::patient_profile(&Identity::from_bytes([9u8; 32]));
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
    }
}
