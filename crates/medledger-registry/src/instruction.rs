//! Registry instructions and signed transactions.
//!
//! An [`Instruction`] is a named operation with a fixed argument list. It
//! is submitted inside a [`SignedTransaction`]; the registry treats the
//! verified signer as the caller identity.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use medledger_core::canonical::{encode_value, int_map};
use medledger_core::{Address, ContentAddress, Identity, Keypair, Role, Salt, Signature};

use crate::error::{RegistryError, Result};

/// Domain separator for transaction signatures.
pub const TX_SIGNATURE_DOMAIN: &[u8] = b"medledger/tx-sig/v1\0";

/// A registry state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Allocate an empty profile for the signer under `role`.
    InitProfile { role: Role },

    /// Register an encrypted blob as a document owned by `patient`.
    CreateDocument {
        patient: Identity,
        content_address: ContentAddress,
        title: String,
        description: String,
        salt: Salt,
    },

    /// Remove a document and every reference to it.
    DeleteDocument {
        patient: Identity,
        content_address: ContentAddress,
    },

    /// Share a document with a doctor.
    GrantAccess { doctor: Identity, document: Address },

    /// Stop sharing a document with a doctor.
    RevokeAccess { doctor: Identity, document: Address },
}

impl Instruction {
    /// Stable instruction name.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::InitProfile { .. } => "init_profile",
            Instruction::CreateDocument { .. } => "create_document",
            Instruction::DeleteDocument { .. } => "delete_document",
            Instruction::GrantAccess { .. } => "grant_access",
            Instruction::RevokeAccess { .. } => "revoke_access",
        }
    }

    /// Accounts the instruction is known to touch when signed by `signer`.
    ///
    /// Deleting a shared document additionally touches the profiles of the
    /// doctors in its access list, which are only known once the document
    /// has been read.
    pub fn accounts(&self, signer: &Identity) -> Vec<Address> {
        match self {
            Instruction::InitProfile { role } => vec![Address::profile(*role, signer)],
            Instruction::CreateDocument {
                patient,
                content_address,
                ..
            }
            | Instruction::DeleteDocument {
                patient,
                content_address,
            } => vec![
                Address::patient_profile(patient),
                Address::document(patient, content_address),
            ],
            Instruction::GrantAccess { doctor, document }
            | Instruction::RevokeAccess { doctor, document } => {
                vec![*document, Address::doctor_profile(doctor)]
            }
        }
    }

    /// Canonical bytes a signer commits to.
    pub fn signing_bytes(&self, signer: &Identity) -> Vec<u8> {
        let mut entries = vec![
            (0, Value::Bytes(signer.0.to_vec())),
            (1, Value::Text(self.name().to_string())),
        ];

        match self {
            Instruction::InitProfile { role } => {
                entries.push((2, Value::Text(role.as_str().to_string())));
            }
            Instruction::CreateDocument {
                patient,
                content_address,
                title,
                description,
                salt,
            } => {
                entries.push((2, Value::Bytes(patient.0.to_vec())));
                entries.push((3, Value::Text(content_address.as_str().to_string())));
                entries.push((4, Value::Text(title.clone())));
                entries.push((5, Value::Text(description.clone())));
                entries.push((6, Value::Bytes(salt.0.to_vec())));
            }
            Instruction::DeleteDocument {
                patient,
                content_address,
            } => {
                entries.push((2, Value::Bytes(patient.0.to_vec())));
                entries.push((3, Value::Text(content_address.as_str().to_string())));
            }
            Instruction::GrantAccess { doctor, document }
            | Instruction::RevokeAccess { doctor, document } => {
                entries.push((2, Value::Bytes(doctor.0.to_vec())));
                entries.push((3, Value::Bytes(document.0.to_vec())));
            }
        }

        let mut buf = TX_SIGNATURE_DOMAIN.to_vec();
        buf.extend_from_slice(&encode_value(&int_map(entries)));
        buf
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes)
            .map_err(|e| RegistryError::InvalidArgument(format!("malformed instruction: {}", e)))
    }
}

/// An instruction together with its signer and signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub signer: Identity,
    pub instruction: Instruction,
    pub signature: Signature,
}

impl SignedTransaction {
    /// Assemble a transaction from a signature produced elsewhere.
    pub fn new(signer: Identity, instruction: Instruction, signature: Signature) -> Self {
        Self {
            signer,
            instruction,
            signature,
        }
    }

    /// Sign an instruction with a local keypair.
    pub fn sign(keypair: &Keypair, instruction: Instruction) -> Self {
        let signer = keypair.identity();
        let signature = keypair.sign(&instruction.signing_bytes(&signer));
        Self::new(signer, instruction, signature)
    }

    /// Verify the signature against the signer and instruction.
    pub fn verify(&self) -> Result<()> {
        self.signer
            .verify(&self.instruction.signing_bytes(&self.signer), &self.signature)
            .map_err(|_| RegistryError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(patient: Identity) -> Instruction {
        Instruction::CreateDocument {
            patient,
            content_address: ContentAddress::new("ipfs1").unwrap(),
            title: "Lab".into(),
            description: "Results".into(),
            salt: Salt::from_bytes([1; 16]),
        }
    }

    #[test]
    fn test_signed_transaction_verifies() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let tx = SignedTransaction::sign(&keypair, create(keypair.identity()));
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_tampered_instruction_rejected() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let mut tx = SignedTransaction::sign(&keypair, create(keypair.identity()));
        tx.instruction = Instruction::InitProfile {
            role: Role::Doctor,
        };
        assert!(matches!(tx.verify(), Err(RegistryError::InvalidSignature)));
    }

    #[test]
    fn test_signature_bound_to_signer() {
        let alice = Keypair::from_seed(&[1; 32]);
        let bob = Keypair::from_seed(&[2; 32]);
        let mut tx = SignedTransaction::sign(&alice, create(alice.identity()));
        tx.signer = bob.identity();
        assert!(tx.verify().is_err());
    }

    #[test]
    fn test_signing_bytes_domain_separated() {
        let id = Keypair::from_seed(&[1; 32]).identity();
        let bytes = create(id).signing_bytes(&id);
        assert!(bytes.starts_with(TX_SIGNATURE_DOMAIN));
        assert_eq!(bytes, create(id).signing_bytes(&id));
    }

    #[test]
    fn test_instruction_cbor_roundtrip() {
        let id = Keypair::from_seed(&[3; 32]).identity();
        let ix = Instruction::GrantAccess {
            doctor: id,
            document: Address::from_bytes([4; 32]),
        };
        assert_eq!(Instruction::from_bytes(&ix.to_bytes()).unwrap(), ix);
    }

    #[test]
    fn test_declared_accounts() {
        let patient = Keypair::from_seed(&[1; 32]).identity();
        let accounts = create(patient).accounts(&patient);
        assert_eq!(accounts[0], Address::patient_profile(&patient));
        assert_eq!(
            accounts[1],
            Address::document(&patient, &ContentAddress::new("ipfs1").unwrap())
        );
    }
}
