//! # Medledger Store
//!
//! Storage abstraction for ledger accounts. Provides a trait-based interface
//! for versioned, all-or-nothing account commits with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The registry is storage-agnostic: it reads accounts through the
//! [`AccountStore`] trait and applies each transaction as one [`WriteSet`].
//! The primary implementation is [`SqliteStore`], with [`MemoryStore`] for
//! testing.
//!
//! ## Key Types
//!
//! - [`AccountStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`WriteSet`] - Reads to re-validate and writes to apply, atomically
//! - [`StoredAccount`] - An account plus the version it was read at
//!
//! ## Usage
//!
//! ```rust,no_run
//! use medledger_core::{Account, Address, Keypair, PatientProfile};
//! use medledger_store::{AccountStore, SqliteStore, WriteSet};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!
//!     let patient = Keypair::generate().identity();
//!     let address = Address::patient_profile(&patient);
//!
//!     let mut writes = WriteSet::new();
//!     writes.put(address, Account::PatientProfile(PatientProfile::new(patient, 10)), None);
//!     store.commit(writes).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Optimistic concurrency**: every entry names the version it was read
//!   at; a mismatch returns `Conflict` and nothing is applied
//! - **Monotonic versions**: versions are commit sequence numbers and are
//!   never reused

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AccountStore, StoredAccount, WriteOp, WriteSet};
