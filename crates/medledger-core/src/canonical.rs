//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! It is used for the persisted account layout and for every byte string
//! that gets signed, so identical inputs produce identical bytes on every
//! platform.
//!
//! ## Account layout
//!
//! Every account is a CBOR map with small integer keys. Keys 0 and 1 are
//! always the layout version and the [`AccountKind`]; list fields carry
//! their allocation-time capacity next to their entries.

use ciborium::value::{Integer, Value};

use crate::account::{Account, AccountKind, BoundedSet, DoctorProfile, Document, PatientProfile};
use crate::address::Address;
use crate::crypto::Identity;
use crate::error::CoreError;
use crate::types::{ContentAddress, Salt, SALT_LEN};

/// Current account layout version.
pub const LAYOUT_VERSION: u8 = 1;

/// Account field keys (integer keys for compact encoding).
mod keys {
    pub const VERSION: u64 = 0;
    pub const KIND: u64 = 1;
    pub const OWNER: u64 = 2;
    pub const ENTRIES: u64 = 3;
    pub const CAPACITY: u64 = 4;
    pub const CONTENT_ADDRESS: u64 = 5;
    pub const TITLE: u64 = 6;
    pub const DESCRIPTION: u64 = 7;
    pub const SALT: u64 = 8;
}

/// Build an integer-keyed CBOR map from `(key, value)` pairs.
pub fn int_map(entries: Vec<(u64, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (Value::Integer(k.into()), v))
            .collect(),
    )
}

/// Encode an account to its canonical persisted bytes.
pub fn encode_account(account: &Account) -> Vec<u8> {
    encode_value(&account_to_cbor_value(account))
}

fn account_to_cbor_value(account: &Account) -> Value {
    let mut entries = vec![
        (keys::VERSION, Value::Integer(LAYOUT_VERSION.into())),
        (keys::KIND, Value::Integer(account.kind().to_u8().into())),
        (keys::OWNER, Value::Bytes(account.owner().0.to_vec())),
    ];

    match account {
        Account::PatientProfile(PatientProfile { documents, .. })
        | Account::DoctorProfile(DoctorProfile { documents, .. }) => {
            push_set(&mut entries, documents);
        }
        Account::Document(doc) => {
            push_set(&mut entries, &doc.access_list);
            entries.push((
                keys::CONTENT_ADDRESS,
                Value::Text(doc.content_address.as_str().to_string()),
            ));
            entries.push((keys::TITLE, Value::Text(doc.title.clone())));
            entries.push((keys::DESCRIPTION, Value::Text(doc.description.clone())));
            entries.push((keys::SALT, Value::Bytes(doc.salt.0.to_vec())));
        }
    }

    int_map(entries)
}

fn push_set<T: AsRef<[u8]> + PartialEq>(entries: &mut Vec<(u64, Value)>, set: &BoundedSet<T>) {
    let items = set.iter().map(|x| Value::Bytes(x.as_ref().to_vec())).collect();
    entries.push((keys::ENTRIES, Value::Array(items)));
    entries.push((keys::CAPACITY, Value::Integer((set.capacity() as u64).into())));
}

/// Decode an account from its persisted bytes.
pub fn decode_account(bytes: &[u8]) -> Result<Account, CoreError> {
    let value: Value = ciborium::from_reader(std::io::Cursor::new(bytes))
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = match &value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedAccount("expected map".into())),
    };

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    let version = uint_field(get(keys::VERSION), "version")?;
    if version != LAYOUT_VERSION as u64 {
        return Err(CoreError::UnsupportedLayout(version));
    }

    let kind_raw = uint_field(get(keys::KIND), "kind")?;
    let kind = u8::try_from(kind_raw)
        .ok()
        .and_then(AccountKind::from_u8)
        .ok_or(CoreError::UnknownAccountKind(kind_raw))?;

    let owner = Identity(bytes32_field(get(keys::OWNER), "owner")?);
    let capacity = uint_field(get(keys::CAPACITY), "capacity")? as usize;
    let entries = match get(keys::ENTRIES) {
        Some(Value::Array(arr)) => arr
            .iter()
            .map(|v| bytes32_field(Some(v), "entry"))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(CoreError::MalformedAccount("missing entries".into())),
    };

    match kind {
        AccountKind::PatientProfile => Ok(Account::PatientProfile(PatientProfile {
            owner,
            documents: BoundedSet::from_parts(capacity, entries.into_iter().map(Address).collect())?,
        })),
        AccountKind::DoctorProfile => Ok(Account::DoctorProfile(DoctorProfile {
            owner,
            documents: BoundedSet::from_parts(capacity, entries.into_iter().map(Address).collect())?,
        })),
        AccountKind::Document => {
            let content_address = ContentAddress::new(text_field(get(keys::CONTENT_ADDRESS), "content_address")?)?;
            let title = text_field(get(keys::TITLE), "title")?;
            let description = text_field(get(keys::DESCRIPTION), "description")?;
            let salt = match get(keys::SALT) {
                Some(Value::Bytes(b)) if b.len() == SALT_LEN => {
                    let mut arr = [0u8; SALT_LEN];
                    arr.copy_from_slice(b);
                    Salt(arr)
                }
                _ => return Err(CoreError::MalformedAccount("invalid salt".into())),
            };
            Ok(Account::Document(Document {
                content_address,
                title,
                description,
                salt,
                owner,
                access_list: BoundedSet::from_parts(
                    capacity,
                    entries.into_iter().map(Identity).collect(),
                )?,
            }))
        }
    }
}

fn uint_field(value: Option<&Value>, name: &str) -> Result<u64, CoreError> {
    match value {
        Some(Value::Integer(i)) => u64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedAccount(format!("negative {}", name))),
        _ => Err(CoreError::MalformedAccount(format!("missing {}", name))),
    }
}

fn bytes32_field(value: Option<&Value>, name: &str) -> Result<[u8; 32], CoreError> {
    match value {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            Ok(arr)
        }
        _ => Err(CoreError::MalformedAccount(format!("invalid {}", name))),
    }
}

fn text_field(value: Option<&Value>, name: &str) -> Result<String, CoreError> {
    match value {
        Some(Value::Text(s)) => Ok(s.clone()),
        _ => Err(CoreError::MalformedAccount(format!("missing {}", name))),
    }
}

/// Encode a CBOR Value to canonical bytes.
///
/// # Panics
///
/// Panics on floats, tags and other values outside the deterministic subset.
/// Callers only build values from integers, byte strings, text, arrays,
/// maps, booleans and null.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => panic!("floats not supported in canonical encoding"),
        _ => panic!("unsupported CBOR value type"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}
