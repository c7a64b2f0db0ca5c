//! Proptest generators for property-based testing.

use proptest::prelude::*;

use medledger_core::{Address, ContentAddress, Identity, Keypair, Role, Salt, SALT_LEN};
use medledger_registry::Instruction;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 32]>().prop_map(Identity::from_bytes)
}

/// Generate a random account address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::from_bytes)
}

pub fn salt() -> impl Strategy<Value = Salt> {
    any::<[u8; SALT_LEN]>().prop_map(Salt::from_bytes)
}

pub fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Patient), Just(Role::Doctor)]
}

/// Generate a printable content address.
pub fn content_address() -> impl Strategy<Value = ContentAddress> {
    "[a-zA-Z0-9:/._-]{1,64}".prop_map(|s| {
        ContentAddress::new(s).expect("generated addresses are printable and non-empty")
    })
}

/// Generate a title or description within `max_len` bytes.
pub fn text(max_len: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("[a-zA-Z0-9 ,.-]{{0,{max_len}}}"))
        .expect("valid regex")
}

/// Parameters for a `create_document` transaction.
#[derive(Debug, Clone)]
pub struct DocumentParams {
    pub keypair: Keypair,
    pub content_address: ContentAddress,
    pub title: String,
    pub description: String,
    pub salt: Salt,
}

impl DocumentParams {
    pub fn instruction(&self) -> Instruction {
        Instruction::CreateDocument {
            patient: self.keypair.identity(),
            content_address: self.content_address.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            salt: self.salt,
        }
    }

    pub fn document_address(&self) -> Address {
        Address::document(&self.keypair.identity(), &self.content_address)
    }
}

impl Arbitrary for DocumentParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (keypair(), content_address(), text(64), text(256), salt())
            .prop_map(
                |(keypair, content_address, title, description, salt)| DocumentParams {
                    keypair,
                    content_address,
                    title,
                    description,
                    salt,
                },
            )
            .boxed()
    }
}
