//! In-memory implementation of the AccountStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use medledger_core::{Account, Address};

use crate::error::Result;
use crate::traits::{check_version, AccountStore, StoredAccount, WriteOp, WriteSet};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    accounts: HashMap<Address, StoredAccount>,
    commit_seq: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                accounts: HashMap::new(),
                commit_seq: 0,
            }),
        }
    }

    /// Snapshot of every live account, for inspection in tests.
    pub fn accounts(&self) -> Vec<(Address, Account)> {
        let inner = self.inner.read().unwrap();
        inner
            .accounts
            .iter()
            .map(|(addr, stored)| (*addr, stored.account.clone()))
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get(&self, address: &Address) -> Result<Option<StoredAccount>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.accounts.get(address).cloned())
    }

    async fn commit(&self, writes: WriteSet) -> Result<u64> {
        writes.validate()?;
        let mut inner = self.inner.write().unwrap();

        // Validate everything before touching anything
        for op in writes.ops() {
            let actual = inner.accounts.get(op.address()).map(|s| s.version);
            if let Err(e) = check_version(op, actual) {
                tracing::debug!(address = %op.address(), "memory store commit conflict");
                return Err(e);
            }
        }

        if writes.write_count() == 0 {
            return Ok(inner.commit_seq);
        }

        let seq = inner.commit_seq + 1;
        for op in writes {
            match op {
                WriteOp::Expect { .. } => {}
                WriteOp::Put {
                    address, account, ..
                } => {
                    inner.accounts.insert(
                        address,
                        StoredAccount {
                            account,
                            version: seq,
                        },
                    );
                }
                WriteOp::Delete { address, .. } => {
                    inner.accounts.remove(&address);
                }
            }
        }
        inner.commit_seq = seq;

        Ok(seq)
    }

    async fn commit_seq(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        Ok(inner.commit_seq)
    }

    async fn len(&self) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        Ok(inner.accounts.len())
    }
}
