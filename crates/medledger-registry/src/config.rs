//! Registry configuration.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Bounds applied when accounts are allocated and arguments validated.
///
/// Capacities only affect newly allocated accounts. An existing account
/// keeps the capacity recorded in its layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum documents listed in a patient or doctor profile.
    pub profile_capacity: usize,
    /// Maximum identities in a document's access list.
    pub access_list_capacity: usize,
    /// Maximum title length in bytes.
    pub max_title_len: usize,
    /// Maximum description length in bytes.
    pub max_description_len: usize,
    /// Maximum content address length in bytes.
    pub max_content_address_len: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            profile_capacity: 10,
            access_list_capacity: 10,
            max_title_len: 64,
            max_description_len: 256,
            max_content_address_len: 128,
        }
    }
}

impl RegistryConfig {
    /// Reject configurations that could never admit a document.
    pub fn validate(&self) -> Result<()> {
        if self.profile_capacity == 0 {
            return Err(RegistryError::InvalidArgument(
                "profile_capacity must be at least 1".into(),
            ));
        }
        if self.access_list_capacity == 0 {
            return Err(RegistryError::InvalidArgument(
                "access_list_capacity must be at least 1".into(),
            ));
        }
        if self.max_content_address_len == 0 {
            return Err(RegistryError::InvalidArgument(
                "max_content_address_len must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
