//! SQLite implementation of the AccountStore trait.
//!
//! This is the primary storage backend for medledger. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking. Each commit
//! runs inside one SQL transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use medledger_core::{decode_account, encode_account, Address};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{check_version, AccountStore, StoredAccount, WriteOp, WriteSet};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ))
    })
}

fn current_version(conn: &Connection, address: &Address) -> Result<Option<u64>> {
    let version: Option<i64> = conn
        .query_row(
            "SELECT version FROM accounts WHERE address = ?1",
            params![address.as_bytes().as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.map(|v| v as u64))
}

fn read_commit_seq(conn: &Connection) -> Result<u64> {
    let seq: i64 = conn.query_row(
        "SELECT commit_seq FROM ledger_state WHERE id = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(seq as u64)
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn get(&self, address: &Address) -> Result<Option<StoredAccount>> {
        let address = *address;

        self.run(move |conn| {
            let row: Option<(Vec<u8>, i64)> = conn
                .query_row(
                    "SELECT data, version FROM accounts WHERE address = ?1",
                    params![address.as_bytes().as_slice()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((data, version)) => {
                    let account = decode_account(&data)?;
                    Ok(Some(StoredAccount {
                        account,
                        version: version as u64,
                    }))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn commit(&self, writes: WriteSet) -> Result<u64> {
        writes.validate()?;

        self.run(move |conn| {
            let tx = conn.transaction()?;

            for op in writes.ops() {
                let actual = current_version(&tx, op.address())?;
                if let Err(e) = check_version(op, actual) {
                    tracing::debug!(address = %op.address(), "sqlite store commit conflict");
                    // Dropping `tx` rolls back
                    return Err(e);
                }
            }

            let current = read_commit_seq(&tx)?;
            if writes.write_count() == 0 {
                return Ok(current);
            }

            let seq = current + 1;
            let now = now_millis();
            for op in writes {
                match op {
                    WriteOp::Expect { .. } => {}
                    WriteOp::Put {
                        address, account, ..
                    } => {
                        let data = encode_account(&account);
                        tx.execute(
                            "INSERT INTO accounts (address, kind, owner, version, data, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                             ON CONFLICT(address) DO UPDATE SET
                                kind = excluded.kind,
                                owner = excluded.owner,
                                version = excluded.version,
                                data = excluded.data,
                                updated_at = excluded.updated_at",
                            params![
                                address.as_bytes().as_slice(),
                                account.kind().to_u8() as i64,
                                account.owner().as_bytes().as_slice(),
                                seq as i64,
                                data,
                                now,
                            ],
                        )?;
                    }
                    WriteOp::Delete { address, .. } => {
                        tx.execute(
                            "DELETE FROM accounts WHERE address = ?1",
                            params![address.as_bytes().as_slice()],
                        )?;
                    }
                }
            }

            tx.execute(
                "UPDATE ledger_state SET commit_seq = ?1 WHERE id = 0",
                params![seq as i64],
            )?;
            tx.commit()?;

            Ok(seq)
        })
        .await
    }

    async fn commit_seq(&self) -> Result<u64> {
        self.run(|conn| read_commit_seq(conn)).await
    }

    async fn len(&self) -> Result<usize> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medledger_core::{
        Account, BoundedSet, ContentAddress, DoctorProfile, Document, Keypair, Salt,
    };

    fn make_document(seed: u8) -> (Address, Account) {
        let owner = Keypair::from_seed(&[seed; 32]).identity();
        let doc = Document {
            content_address: ContentAddress::new(format!("ipfs{}", seed)).unwrap(),
            title: "scan".into(),
            description: "x-ray".into(),
            salt: Salt::from_bytes([seed; 16]),
            owner,
            access_list: BoundedSet::with_capacity(10),
        };
        (doc.address(), Account::Document(doc))
    }

    #[tokio::test]
    async fn test_put_and_get_account() {
        let store = SqliteStore::open_memory().unwrap();
        let (addr, account) = make_document(1);

        let mut ws = WriteSet::new();
        ws.put(addr, account.clone(), None);
        assert_eq!(store.commit(ws).await.unwrap(), 1);

        let stored = store.get(&addr).await.unwrap().unwrap();
        assert_eq!(stored.account, account);
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn test_conflict_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let (a, account_a) = make_document(1);
        let (b, account_b) = make_document(2);

        let mut ws = WriteSet::new();
        ws.put(a, account_a.clone(), None);
        store.commit(ws).await.unwrap();

        let mut ws = WriteSet::new();
        ws.put(b, account_b, None).put(a, account_a, Some(7));
        let err = store.commit(ws).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict { expected: Some(7), actual: Some(1), .. }
        ));

        assert!(store.get(&b).await.unwrap().is_none());
        assert_eq!(store.commit_seq().await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_delete_removes() {
        let store = SqliteStore::open_memory().unwrap();
        let doctor = Keypair::from_seed(&[9; 32]).identity();
        let addr = Address::doctor_profile(&doctor);
        let mut profile = DoctorProfile::new(doctor, 10);

        let mut ws = WriteSet::new();
        ws.put(addr, Account::DoctorProfile(profile.clone()), None);
        store.commit(ws).await.unwrap();

        profile.documents.insert(Address::from_bytes([3; 32])).unwrap();
        let mut ws = WriteSet::new();
        ws.put(addr, Account::DoctorProfile(profile.clone()), Some(1));
        store.commit(ws).await.unwrap();

        let stored = store.get(&addr).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.account.as_doctor_profile().unwrap().documents.len(), 1);

        let mut ws = WriteSet::new();
        ws.delete(addr, 2);
        store.commit(ws).await.unwrap();
        assert!(store.get(&addr).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let (addr, account) = make_document(4);

        {
            let store = SqliteStore::open(&path).unwrap();
            let mut ws = WriteSet::new();
            ws.put(addr, account.clone(), None);
            store.commit(ws).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(&addr).await.unwrap().unwrap().account, account);
        assert_eq!(store.commit_seq().await.unwrap(), 1);
    }
}
