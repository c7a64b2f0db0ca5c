//! Vault configuration.

use medledger_registry::RegistryConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a [`Vault`](crate::Vault).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Bounds for the embedded registry.
    pub registry: RegistryConfig,
    /// Re-hash downloaded blobs against their address before decrypting.
    pub verify_content_address: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            verify_content_address: true,
        }
    }
}
