//! Ledger account records.
//!
//! Three record types live on the ledger: patient profiles, doctor profiles
//! and documents. Their list fields are [`BoundedSet`]s whose capacity is
//! fixed when the account is allocated and travels with the persisted
//! layout.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::Identity;
use crate::error::CoreError;
use crate::types::{ContentAddress, Role, Salt};

/// An insertion-ordered set with a fixed capacity.
///
/// Inserting an element that is already present is a no-op. Inserting a new
/// element into a full set fails with [`CoreError::CapacityExceeded`] and
/// leaves the set unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedSet<T> {
    capacity: usize,
    items: Vec<T>,
}

impl<T: PartialEq> BoundedSet<T> {
    /// Create an empty set with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Rebuild a set from persisted parts.
    ///
    /// Fails if the items exceed the capacity or contain duplicates.
    pub fn from_parts(capacity: usize, items: Vec<T>) -> Result<Self, CoreError> {
        if items.len() > capacity {
            return Err(CoreError::MalformedAccount(format!(
                "{} entries exceed capacity {}",
                items.len(),
                capacity
            )));
        }
        for (i, item) in items.iter().enumerate() {
            if items[..i].contains(item) {
                return Err(CoreError::MalformedAccount("duplicate entry".into()));
            }
        }
        Ok(Self { capacity, items })
    }

    /// Insert an element. Returns `Ok(true)` if it was added, `Ok(false)` if
    /// it was already present.
    pub fn insert(&mut self, item: T) -> Result<bool, CoreError> {
        if self.items.contains(&item) {
            return Ok(false);
        }
        if self.items.len() >= self.capacity {
            return Err(CoreError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(true)
    }

    /// Remove an element, keeping the order of the rest. Returns whether it
    /// was present.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|x| x == item) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Whether one more distinct element would fit.
    pub fn has_room(&self) -> bool {
        self.items.len() < self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a BoundedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A patient's profile: the documents they currently own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub owner: Identity,
    pub documents: BoundedSet<Address>,
}

impl PatientProfile {
    pub fn new(owner: Identity, capacity: usize) -> Self {
        Self {
            owner,
            documents: BoundedSet::with_capacity(capacity),
        }
    }
}

/// A doctor's profile: the documents currently shared with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub owner: Identity,
    pub documents: BoundedSet<Address>,
}

impl DoctorProfile {
    pub fn new(owner: Identity, capacity: usize) -> Self {
        Self {
            owner,
            documents: BoundedSet::with_capacity(capacity),
        }
    }
}

/// An encrypted document registered on the ledger.
///
/// The blob itself lives in the content store; the ledger holds its
/// address, descriptive metadata, the key-derivation salt, the owner and the
/// identities the owner has shared it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content_address: ContentAddress,
    pub title: String,
    pub description: String,
    pub salt: Salt,
    pub owner: Identity,
    pub access_list: BoundedSet<Identity>,
}

impl Document {
    /// The derived address of this document.
    pub fn address(&self) -> Address {
        Address::document(&self.owner, &self.content_address)
    }

    /// Whether `identity` may view this document (owner or granted).
    pub fn is_viewable_by(&self, identity: &Identity) -> bool {
        self.owner == *identity || self.access_list.contains(identity)
    }
}

/// Discriminator for the kind of record stored in an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccountKind {
    PatientProfile = 1,
    DoctorProfile = 2,
    Document = 3,
}

impl AccountKind {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::PatientProfile),
            2 => Some(Self::DoctorProfile),
            3 => Some(Self::Document),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::PatientProfile => "patient_profile",
            AccountKind::DoctorProfile => "doctor_profile",
            AccountKind::Document => "document",
        }
    }
}

impl From<Role> for AccountKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Patient => AccountKind::PatientProfile,
            Role::Doctor => AccountKind::DoctorProfile,
        }
    }
}

/// Any record that can occupy a ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Account {
    PatientProfile(PatientProfile),
    DoctorProfile(DoctorProfile),
    Document(Document),
}

impl Account {
    pub fn kind(&self) -> AccountKind {
        match self {
            Account::PatientProfile(_) => AccountKind::PatientProfile,
            Account::DoctorProfile(_) => AccountKind::DoctorProfile,
            Account::Document(_) => AccountKind::Document,
        }
    }

    /// The identity that owns this account.
    pub fn owner(&self) -> &Identity {
        match self {
            Account::PatientProfile(p) => &p.owner,
            Account::DoctorProfile(d) => &d.owner,
            Account::Document(doc) => &doc.owner,
        }
    }

    pub fn as_patient_profile(&self) -> Option<&PatientProfile> {
        match self {
            Account::PatientProfile(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_doctor_profile(&self) -> Option<&DoctorProfile> {
        match self {
            Account::DoctorProfile(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Account::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 32])
    }

    #[test]
    fn test_bounded_set_insert_is_idempotent() {
        let mut set = BoundedSet::with_capacity(3);
        assert!(set.insert(addr(1)).unwrap());
        assert!(!set.insert(addr(1)).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_bounded_set_capacity() {
        let mut set = BoundedSet::with_capacity(2);
        set.insert(addr(1)).unwrap();
        set.insert(addr(2)).unwrap();

        assert_eq!(
            set.insert(addr(3)),
            Err(CoreError::CapacityExceeded { capacity: 2 })
        );
        // Re-inserting a present element is fine even when full.
        assert_eq!(set.insert(addr(2)), Ok(false));
        assert_eq!(set.as_slice(), &[addr(1), addr(2)]);
    }

    #[test]
    fn test_bounded_set_remove_preserves_order() {
        let mut set = BoundedSet::with_capacity(4);
        for n in 1..=3 {
            set.insert(addr(n)).unwrap();
        }
        assert!(set.remove(&addr(2)));
        assert!(!set.remove(&addr(2)));
        assert_eq!(set.as_slice(), &[addr(1), addr(3)]);
    }

    #[test]
    fn test_from_parts_rejects_duplicates_and_overflow() {
        assert!(BoundedSet::from_parts(1, vec![addr(1), addr(2)]).is_err());
        assert!(BoundedSet::from_parts(4, vec![addr(1), addr(1)]).is_err());
        assert!(BoundedSet::from_parts(4, vec![addr(1), addr(2)]).is_ok());
    }

    #[test]
    fn test_document_viewers() {
        let owner = Identity::from_bytes([1u8; 32]);
        let doctor = Identity::from_bytes([2u8; 32]);
        let stranger = Identity::from_bytes([3u8; 32]);

        let mut doc = Document {
            content_address: ContentAddress::new("ipfs1").unwrap(),
            title: "t".into(),
            description: String::new(),
            salt: Salt::from_bytes([0u8; 16]),
            owner,
            access_list: BoundedSet::with_capacity(2),
        };
        doc.access_list.insert(doctor).unwrap();

        assert!(doc.is_viewable_by(&owner));
        assert!(doc.is_viewable_by(&doctor));
        assert!(!doc.is_viewable_by(&stranger));
    }
}
