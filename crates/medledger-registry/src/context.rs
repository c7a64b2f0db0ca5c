//! Transaction context: staged account changes for one instruction.
//!
//! A state transition reads accounts through the context and stages its
//! writes there. Nothing reaches the store until the context is turned
//! into a [`WriteSet`], which re-asserts the version of every account the
//! transition read. A failed transition simply drops its context.

use std::collections::BTreeMap;

use medledger_core::{Account, Address};
use medledger_store::{AccountStore, WriteSet};

use crate::error::Result;

struct Entry {
    version: Option<u64>,
    original: Option<Account>,
    current: Option<Account>,
}

impl Entry {
    fn absent() -> Self {
        Self {
            version: None,
            original: None,
            current: None,
        }
    }

    fn is_dirty(&self) -> bool {
        self.original != self.current
    }
}

/// Read-tracking, write-staging view of ledger state.
pub struct TxContext<'a, S: AccountStore + ?Sized> {
    store: &'a S,
    entries: BTreeMap<Address, Entry>,
}

impl<'a, S: AccountStore + ?Sized> TxContext<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            entries: BTreeMap::new(),
        }
    }

    async fn load(&mut self, address: &Address) -> Result<&mut Entry> {
        if !self.entries.contains_key(address) {
            let entry = match self.store.get(address).await? {
                Some(s) => Entry {
                    version: Some(s.version),
                    original: Some(s.account.clone()),
                    current: Some(s.account),
                },
                None => Entry::absent(),
            };
            self.entries.insert(*address, entry);
        }
        Ok(self.entries.entry(*address).or_insert_with(Entry::absent))
    }

    /// Load a set of accounts up front.
    pub async fn prefetch(&mut self, addresses: &[Address]) -> Result<()> {
        for address in addresses {
            self.load(address).await?;
        }
        Ok(())
    }

    /// The staged state of an account.
    pub async fn get(&mut self, address: &Address) -> Result<Option<Account>> {
        Ok(self.load(address).await?.current.clone())
    }

    /// Stage a create or replace.
    pub async fn put(&mut self, address: Address, account: Account) -> Result<()> {
        self.load(&address).await?.current = Some(account);
        Ok(())
    }

    /// Stage a removal.
    pub async fn delete(&mut self, address: &Address) -> Result<()> {
        self.load(address).await?.current = None;
        Ok(())
    }

    /// Addresses whose staged state differs from what was read, in
    /// address order.
    pub fn touched(&self) -> Vec<Address> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_dirty())
            .map(|(a, _)| *a)
            .collect()
    }

    /// Every address read or written.
    pub fn accessed(&self) -> Vec<Address> {
        self.entries.keys().copied().collect()
    }

    /// Build the write set: writes for changed accounts, version
    /// assertions for everything else that was read.
    pub fn into_write_set(self) -> WriteSet {
        let mut writes = WriteSet::new();
        for (address, entry) in self.entries {
            let dirty = entry.is_dirty();
            match (dirty, entry.current, entry.version) {
                (false, _, version) => {
                    writes.expect(address, version);
                }
                (true, Some(account), version) => {
                    writes.put(address, account, version);
                }
                (true, None, Some(version)) => {
                    writes.delete(address, version);
                }
                // Dirty but absent both before and after cannot happen
                (true, None, None) => {
                    writes.expect(address, None);
                }
            }
        }
        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medledger_core::{Keypair, PatientProfile};
    use medledger_store::{MemoryStore, WriteOp};

    fn profile(seed: u8) -> (Address, Account) {
        let id = Keypair::from_seed(&[seed; 32]).identity();
        (
            Address::patient_profile(&id),
            Account::PatientProfile(PatientProfile::new(id, 10)),
        )
    }

    #[tokio::test]
    async fn test_reads_become_expectations() {
        let store = MemoryStore::new();
        let (a, _) = profile(1);
        let mut ctx = TxContext::new(&store);

        assert!(ctx.get(&a).await.unwrap().is_none());
        assert!(ctx.touched().is_empty());

        let ws = ctx.into_write_set();
        assert_eq!(
            ws.ops(),
            &[WriteOp::Expect {
                address: a,
                expected: None
            }]
        );
    }

    #[tokio::test]
    async fn test_staged_writes_are_not_visible_in_store() {
        let store = MemoryStore::new();
        let (a, account) = profile(1);
        let mut ctx = TxContext::new(&store);

        ctx.put(a, account.clone()).await.unwrap();
        assert_eq!(ctx.get(&a).await.unwrap(), Some(account));
        assert!(store.get(&a).await.unwrap().is_none());
        assert_eq!(ctx.touched(), vec![a]);
    }

    #[tokio::test]
    async fn test_put_then_delete_of_new_account_is_noop() {
        let store = MemoryStore::new();
        let (a, account) = profile(1);
        let mut ctx = TxContext::new(&store);

        ctx.put(a, account).await.unwrap();
        ctx.delete(&a).await.unwrap();
        assert!(ctx.touched().is_empty());
        assert_eq!(ctx.into_write_set().write_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_carries_read_version() {
        let store = MemoryStore::new();
        let (a, account) = profile(1);
        let mut ws = WriteSet::new();
        ws.put(a, account, None);
        store.commit(ws).await.unwrap();

        let mut ctx = TxContext::new(&store);
        ctx.delete(&a).await.unwrap();
        let ws = ctx.into_write_set();
        assert_eq!(
            ws.ops(),
            &[WriteOp::Delete {
                address: a,
                expected: 1
            }]
        );
    }
}
