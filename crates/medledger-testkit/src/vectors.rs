//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the exact bytes of the persisted account layout and of
//! the key-derivation message. A change to either silently breaks every
//! stored ledger or every previously derived document key, so both are
//! compared byte for byte.

use medledger_core::{
    derive_address, encode_account, Account, BoundedSet, ContentAddress, Document, Identity,
    Namespace, PatientProfile, Salt,
};
use medledger_keys::KeyRequest;

/// What a vector encodes.
#[derive(Debug, Clone)]
pub enum VectorInput {
    /// The message handed to the signer for key derivation.
    KeyMessage {
        document_id: &'static [u8],
        file_name: &'static str,
        salt: [u8; 16],
    },
    /// An empty patient profile.
    PatientProfile { owner: [u8; 32], capacity: usize },
    /// A document shared with one identity.
    Document {
        owner: [u8; 32],
        grantee: [u8; 32],
        content_address: &'static str,
        title: &'static str,
        description: &'static str,
        salt: [u8; 16],
    },
    /// A derived account address.
    Address {
        namespace: Namespace,
        owner: [u8; 32],
        extra: &'static [u8],
    },
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub input: VectorInput,
    /// Expected output (hex).
    pub expected_hex: &'static str,
}

impl GoldenVector {
    /// Compute the vector's output bytes.
    pub fn compute(&self) -> Vec<u8> {
        match &self.input {
            VectorInput::KeyMessage {
                document_id,
                file_name,
                salt,
            } => KeyRequest::new(document_id.to_vec(), *file_name, Salt::from_bytes(*salt))
                .canonical_message(),
            VectorInput::PatientProfile { owner, capacity } => {
                let profile = PatientProfile::new(Identity::from_bytes(*owner), *capacity);
                encode_account(&Account::PatientProfile(profile))
            }
            VectorInput::Document {
                owner,
                grantee,
                content_address,
                title,
                description,
                salt,
            } => encode_account(&Account::Document(Document {
                content_address: ContentAddress::new(*content_address)
                    .expect("vector content address is valid"),
                title: title.to_string(),
                description: description.to_string(),
                salt: Salt::from_bytes(*salt),
                owner: Identity::from_bytes(*owner),
                access_list: BoundedSet::from_parts(10, vec![Identity::from_bytes(*grantee)])
                    .expect("one grantee fits"),
            })),
            VectorInput::Address {
                namespace,
                owner,
                extra,
            } => derive_address(*namespace, &Identity::from_bytes(*owner), extra)
                .as_bytes()
                .to_vec(),
        }
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "key message with short id",
            input: VectorInput::KeyMessage {
                document_id: b"doc-1",
                file_name: "scan.pdf",
                salt: [0x00; 16],
            },
            expected_hex: "6d65646c65646765722f646f63756d656e742d6b65792f763100\
                           a30045646f632d3101687363616e2e706466\
                           025000000000000000000000000000000000",
        },
        GoldenVector {
            name: "key message with identity-sized id",
            input: VectorInput::KeyMessage {
                document_id: &[0x42; 32],
                file_name: "x-ray 2024.png",
                salt: [
                    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b,
                    0x0c, 0x0d, 0x0e, 0x0f,
                ],
            },
            expected_hex: "6d65646c65646765722f646f63756d656e742d6b65792f763100\
                           a300582042424242424242424242424242424242\
                           42424242424242424242424242424242\
                           016e782d72617920323032342e706e67\
                           0250000102030405060708090a0b0c0d0e0f",
        },
        GoldenVector {
            name: "key message with empty fields",
            input: VectorInput::KeyMessage {
                document_id: b"",
                file_name: "",
                salt: [0xff; 16],
            },
            expected_hex: "6d65646c65646765722f646f63756d656e742d6b65792f763100\
                           a3004001600250ffffffffffffffffffffffffffffffff",
        },
        GoldenVector {
            name: "empty patient profile",
            input: VectorInput::PatientProfile {
                owner: [0x11; 32],
                capacity: 10,
            },
            expected_hex: "a5000101010258201111111111111111111111111111111111111111111111111111111111111111\
                           0380040a",
        },
        GoldenVector {
            name: "document shared once",
            input: VectorInput::Document {
                owner: [0x22; 32],
                grantee: [0x33; 32],
                content_address: "ipfs://cid",
                title: "Lab",
                description: "",
                salt: [0x01; 16],
            },
            expected_hex: "a9000101030258202222222222222222222222222222222222222222222222222222222222222222\
                           038158203333333333333333333333333333333333333333333333333333333333333333\
                           040a056a697066733a2f2f636964\
                           06634c616207600850\
                           01010101010101010101010101010101",
        },
        GoldenVector {
            name: "patient profile address",
            input: VectorInput::Address {
                namespace: Namespace::PatientProfile,
                owner: [0x42; 32],
                extra: b"",
            },
            expected_hex: "370eb2dd4279f84ccac4d10fcaedb3e5ef7d9ba09fb5c4d81ae5cd8cf8c5edea",
        },
        GoldenVector {
            name: "doctor profile address",
            input: VectorInput::Address {
                namespace: Namespace::DoctorProfile,
                owner: [0x42; 32],
                extra: b"",
            },
            expected_hex: "454a716f31cc43607fe47eb8c04b6658521cef334502b8924caa45b3315af206",
        },
        GoldenVector {
            name: "document address",
            input: VectorInput::Address {
                namespace: Namespace::Document,
                owner: [0x42; 32],
                extra: b"ipfs://cid",
            },
            expected_hex: "01335b498ea5ecc060747cd20f0e28515f9c0d187b3958ae6449c8eed516493c",
        },
    ]
}

/// Check every vector. Returns `(name, matches, computed hex)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = hex::encode(v.compute());
            let matches = hex == v.expected_hex;
            (v.name.to_string(), matches, hex)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use medledger_core::{decode_account, Address};

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, hex) in verify_all_vectors() {
            assert!(matches, "vector '{name}' produced {hex}");
        }
    }

    #[test]
    fn test_layout_vectors_decode() {
        for vector in all_vectors() {
            if matches!(
                vector.input,
                VectorInput::PatientProfile { .. } | VectorInput::Document { .. }
            ) {
                let bytes = vector.compute();
                let account = decode_account(&bytes).unwrap();
                assert_eq!(encode_account(&account), bytes, "vector '{}'", vector.name);
            }
        }
    }

    #[test]
    fn test_address_vectors_are_distinct() {
        let addresses: Vec<_> = all_vectors()
            .into_iter()
            .filter(|v| matches!(v.input, VectorInput::Address { .. }))
            .map(|v| v.compute())
            .collect();
        assert_eq!(addresses.len(), 3);
        assert_ne!(addresses[0], addresses[1]);
        assert_ne!(addresses[1], addresses[2]);
        assert_ne!(addresses[0], addresses[2]);
        assert!(addresses.iter().all(|a| a.len() == 32));
    }

    #[test]
    fn test_every_vector_pins_bytes() {
        for vector in all_vectors() {
            assert!(
                !vector.expected_hex.is_empty(),
                "vector '{}' has no expected output",
                vector.name
            );
        }
    }

    #[test]
    fn test_vectors_match_typed_constructors() {
        let owner = Identity::from_bytes([0x42; 32]);
        let content = ContentAddress::new("ipfs://cid").unwrap();
        let expected: Vec<_> = all_vectors()
            .into_iter()
            .filter(|v| matches!(v.input, VectorInput::Address { .. }))
            .map(|v| v.expected_hex)
            .collect();

        assert_eq!(hex::encode(Address::patient_profile(&owner).as_bytes()), expected[0]);
        assert_eq!(hex::encode(Address::doctor_profile(&owner).as_bytes()), expected[1]);
        assert_eq!(hex::encode(Address::document(&owner, &content).as_bytes()), expected[2]);
    }
}
