//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use medledger_core::{Address, ContentAddress, Identity, Keypair, Role, Salt};
use medledger_keys::{X25519PublicKey, X25519StaticSecret};
use medledger_registry::{Instruction, Registry, RegistryConfig, SignedTransaction};
use medledger_store::MemoryStore;
use tracing_subscriber::filter::LevelFilter;

/// One party: a signing keypair plus an X25519 secret for receiving key
/// shares. Both are derived from the same seed.
pub struct TestFixture {
    pub keypair: Keypair,
    pub exchange: X25519StaticSecret,
}

impl TestFixture {
    /// Create a new test fixture with random keys.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            exchange: X25519StaticSecret::generate(),
        }
    }

    /// Create with deterministic keys from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            exchange: X25519StaticSecret::from_bytes(seed),
        }
    }

    pub fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    /// Public half of the key-share secret.
    pub fn exchange_public(&self) -> X25519PublicKey {
        self.exchange.public_key()
    }

    pub fn profile_address(&self, role: Role) -> Address {
        Address::profile(role, &self.identity())
    }

    /// A content address unique to `label`.
    pub fn content_address(&self, label: &str) -> ContentAddress {
        ContentAddress::new(format!("test://{label}"))
            .expect("fixture labels are valid content addresses")
    }

    /// Address of the document this party would create for `label`.
    pub fn document_address(&self, label: &str) -> Address {
        Address::document(&self.identity(), &self.content_address(label))
    }

    /// Sign an arbitrary instruction.
    pub fn sign(&self, instruction: Instruction) -> SignedTransaction {
        SignedTransaction::sign(&self.keypair, instruction)
    }

    pub fn init_profile(&self, role: Role) -> SignedTransaction {
        self.sign(Instruction::InitProfile { role })
    }

    /// A signed `create_document` for `label`, owned by this party.
    pub fn create_document(&self, label: &str) -> SignedTransaction {
        self.sign(Instruction::CreateDocument {
            patient: self.identity(),
            content_address: self.content_address(label),
            title: format!("{label} title"),
            description: format!("{label} description"),
            salt: label_salt(label),
        })
    }

    pub fn delete_document(&self, label: &str) -> SignedTransaction {
        self.sign(Instruction::DeleteDocument {
            patient: self.identity(),
            content_address: self.content_address(label),
        })
    }

    pub fn grant(&self, doctor: Identity, document: Address) -> SignedTransaction {
        self.sign(Instruction::GrantAccess { doctor, document })
    }

    pub fn revoke(&self, doctor: Identity, document: Address) -> SignedTransaction {
        self.sign(Instruction::RevokeAccess { doctor, document })
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic per-label salt, so fixtures are reproducible.
fn label_salt(label: &str) -> Salt {
    let mut salt = [0u8; 16];
    for (i, b) in label.bytes().enumerate() {
        salt[i % 16] ^= b.rotate_left(i as u32 % 8);
    }
    Salt::from_bytes(salt)
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0x5a;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A registry over a fresh in-memory store.
pub fn memory_registry() -> Registry<MemoryStore> {
    memory_registry_with(RegistryConfig::default())
}

pub fn memory_registry_with(config: RegistryConfig) -> Registry<MemoryStore> {
    Registry::new(MemoryStore::new(), config)
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(LevelFilter::DEBUG)
        .try_init();
}
