//! AccountStore trait: the abstract interface for ledger account state.
//!
//! The registry never mutates accounts one at a time. It stages a whole
//! transition, then hands the store a [`WriteSet`] that is applied
//! all-or-nothing. Every entry carries the version the registry observed
//! when it read the account, so a commit fails with
//! [`StoreError::Conflict`](crate::StoreError::Conflict) if any of those
//! accounts changed in between.

use async_trait::async_trait;
use medledger_core::{Account, Address};

use crate::error::{Result, StoreError};

/// An account together with the commit sequence that last wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAccount {
    pub account: Account,
    pub version: u64,
}

/// A single entry in a write set.
///
/// `expected` is the version observed at read time; `None` means the
/// account must be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Assert an account is unchanged without writing it.
    Expect {
        address: Address,
        expected: Option<u64>,
    },
    /// Create or replace an account.
    Put {
        address: Address,
        account: Account,
        expected: Option<u64>,
    },
    /// Remove an account.
    Delete { address: Address, expected: u64 },
}

impl WriteOp {
    pub fn address(&self) -> &Address {
        match self {
            WriteOp::Expect { address, .. }
            | WriteOp::Put { address, .. }
            | WriteOp::Delete { address, .. } => address,
        }
    }

    /// The version this entry requires the account to be at.
    pub fn expected(&self) -> Option<u64> {
        match self {
            WriteOp::Expect { expected, .. } | WriteOp::Put { expected, .. } => *expected,
            WriteOp::Delete { expected, .. } => Some(*expected),
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, WriteOp::Expect { .. })
    }
}

/// The complete set of reads and writes of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    ops: Vec<WriteOp>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&mut self, address: Address, expected: Option<u64>) -> &mut Self {
        self.ops.push(WriteOp::Expect { address, expected });
        self
    }

    pub fn put(&mut self, address: Address, account: Account, expected: Option<u64>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            address,
            account,
            expected,
        });
        self
    }

    pub fn delete(&mut self, address: Address, expected: u64) -> &mut Self {
        self.ops.push(WriteOp::Delete { address, expected });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of entries that modify state.
    pub fn write_count(&self) -> usize {
        self.ops.iter().filter(|op| op.is_write()).count()
    }

    /// Reject write sets that mention an address more than once.
    pub fn validate(&self) -> Result<()> {
        for (i, op) in self.ops.iter().enumerate() {
            if self.ops[..i].iter().any(|o| o.address() == op.address()) {
                return Err(StoreError::InvalidWriteSet(format!(
                    "address {} appears more than once",
                    op.address()
                )));
            }
        }
        Ok(())
    }
}

impl IntoIterator for WriteSet {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Check one entry against the version currently stored.
pub(crate) fn check_version(op: &WriteOp, actual: Option<u64>) -> Result<()> {
    if op.expected() != actual {
        return Err(StoreError::Conflict {
            address: *op.address(),
            expected: op.expected(),
            actual,
        });
    }
    Ok(())
}

/// The AccountStore trait: async interface for ledger account state.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Versions**: an account's version is the commit sequence that last
///   wrote it, so a deleted-then-recreated account never reuses a version.
/// - **Atomic commits**: [`commit`](AccountStore::commit) validates every
///   entry before applying any of them.
/// - **No locking**: conflicting commits are rejected, never queued.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get an account and its current version.
    async fn get(&self, address: &Address) -> Result<Option<StoredAccount>>;

    /// Apply a write set atomically.
    ///
    /// # Returns
    /// - The new commit sequence if the set contained writes.
    /// - The current commit sequence if it only contained assertions.
    ///
    /// # Errors
    /// - `Conflict` if any entry's expected version does not match. Nothing
    ///   is applied.
    /// - `InvalidWriteSet` if an address appears more than once.
    async fn commit(&self, writes: WriteSet) -> Result<u64>;

    /// The sequence number of the most recent commit (0 if none).
    async fn commit_seq(&self) -> Result<u64>;

    /// Number of live accounts.
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_duplicate_addresses() {
        let addr = Address::from_bytes([1; 32]);
        let mut ws = WriteSet::new();
        ws.expect(addr, None).delete(addr, 3);
        assert!(matches!(
            ws.validate(),
            Err(StoreError::InvalidWriteSet(_))
        ));
    }

    #[test]
    fn test_write_count_ignores_expectations() {
        let mut ws = WriteSet::new();
        ws.expect(Address::from_bytes([1; 32]), Some(1))
            .delete(Address::from_bytes([2; 32]), 2);
        assert_eq!(ws.len(), 2);
        assert_eq!(ws.write_count(), 1);
        assert!(ws.validate().is_ok());
    }

    #[test]
    fn test_check_version() {
        let op = WriteOp::Delete {
            address: Address::from_bytes([1; 32]),
            expected: 4,
        };
        assert!(check_version(&op, Some(4)).is_ok());
        assert!(check_version(&op, Some(5)).unwrap_err().is_conflict());
        assert!(check_version(&op, None).unwrap_err().is_conflict());
    }
}
