//! The signing capability.
//!
//! Key derivation never sees secret key material. It asks an opaque
//! [`Signer`] for a signature and hashes whatever bytes come back, so any
//! signature scheme works as long as it is deterministic for a given
//! message.

use medledger_core::{Identity, Keypair};

use crate::error::Result;

/// Something that can sign on behalf of an identity.
pub trait Signer: Send + Sync {
    /// The identity signatures are produced under.
    fn identity(&self) -> Identity;

    /// Sign `message`, returning the raw signature bytes.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

impl Signer for Keypair {
    fn identity(&self) -> Identity {
        Keypair::identity(self)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        Ok(Keypair::sign(self, message).0.to_vec())
    }
}

impl<T: Signer + ?Sized> Signer for &T {
    fn identity(&self) -> Identity {
        (**self).identity()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_signer_matches_inherent_sign() {
        let keypair = Keypair::from_seed(&[5; 32]);
        let via_trait = Signer::sign(&keypair, b"msg").unwrap();
        assert_eq!(via_trait, keypair.sign(b"msg").0.to_vec());
        assert_eq!(Signer::identity(&keypair), keypair.identity());
    }
}
