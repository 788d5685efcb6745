//! Option and configuration structs for the item store.

use serde::{Deserialize, Serialize};

/// Minimum password length accepted when a new keyset is created.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Cipher used for item content and the overview index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherAlgorithm {
    /// age file format with an X25519 recipient derived from the key.
    #[default]
    AgeX25519,
}

/// Parameters passed to every `KeyAgent::encrypt`/`decrypt` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoParams {
    #[serde(default)]
    pub algorithm: CipherAlgorithm,
}

/// Options for `ItemStore::list_items`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListItemsOptions {
    /// Include items marked as trashed.
    pub include_tombstones: bool,
}

impl ListItemsOptions {
    pub fn with_tombstones() -> Self {
        Self {
            include_tombstones: true,
        }
    }
}

/// Item store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub crypto: CryptoParams,
    pub min_password_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            crypto: CryptoParams::default(),
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_defaults_fill_missing_fields() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.min_password_length, 8);
        assert_eq!(config.crypto.algorithm, CipherAlgorithm::AgeX25519);
    }

    #[test]
    fn test_list_options_default_hides_tombstones() {
        assert!(!ListItemsOptions::default().include_tombstones);
        assert!(ListItemsOptions::with_tombstones().include_tombstones);
    }
}
