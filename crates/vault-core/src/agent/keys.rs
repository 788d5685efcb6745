//! Key material and its password-wrapped persisted form.

use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::encryption::{decrypt_with_password, encrypt_with_password};
use crate::error::{Result, VaultError};

/// A decrypted vault key.
///
/// Holds an age X25519 identity; the secret scalar is zeroized on drop.
pub struct KeyMaterial {
    identity: age::x25519::Identity,
}

impl KeyMaterial {
    pub fn generate() -> Self {
        Self {
            identity: age::x25519::Identity::generate(),
        }
    }

    /// Parse an encoded `AGE-SECRET-KEY-1...` string.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let identity = age::x25519::Identity::from_str(encoded)
            .map_err(|e| VaultError::Crypto(format!("Invalid key material: {}", e)))?;
        Ok(Self { identity })
    }

    pub(crate) fn encode(&self) -> SecretString {
        self.identity.to_string()
    }

    pub(crate) fn identity(&self) -> &age::x25519::Identity {
        &self.identity
    }

    pub fn recipient(&self) -> age::x25519::Recipient {
        self.identity.to_public()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("recipient", &self.recipient().to_string())
            .field("identity", &"[REDACTED]")
            .finish()
    }
}

/// A key as persisted in the keystore: id plus password-encrypted material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    pub id: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl StoredKey {
    pub fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Encrypt `material` under `password`.
    ///
    /// Runs age's scrypt KDF; call from a blocking context.
    pub fn seal(id: impl Into<String>, material: &KeyMaterial, password: &str) -> Result<Self> {
        let encoded = material.encode();
        let data = encrypt_with_password(encoded.expose_secret().as_bytes(), password)?;
        Ok(Self {
            id: id.into(),
            data,
        })
    }

    /// Decrypt the key material with `password`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidPassword` if the password is wrong.
    pub fn unseal(&self, password: &str) -> Result<KeyMaterial> {
        let plaintext = Zeroizing::new(decrypt_with_password(&self.data, password)?);
        let encoded = std::str::from_utf8(&plaintext)
            .map_err(|_| VaultError::Crypto("Key material is not valid UTF-8".to_string()))?;
        KeyMaterial::from_encoded(encoded.trim())
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_unseal_round_trip() {
        let material = KeyMaterial::generate();
        let stored = StoredKey::seal("k1", &material, "correct horse battery").unwrap();

        let restored = stored.unseal("correct horse battery").unwrap();
        assert_eq!(
            restored.recipient().to_string(),
            material.recipient().to_string()
        );
    }

    #[test]
    fn test_unseal_with_wrong_password() {
        let stored = StoredKey::seal("k1", &KeyMaterial::generate(), "hunter2").unwrap();
        assert!(matches!(
            stored.unseal("hunter3"),
            Err(VaultError::InvalidPassword)
        ));
    }

    #[test]
    fn test_stored_key_json_uses_base64() {
        let stored = StoredKey {
            id: "abc".to_string(),
            data: vec![0, 1, 2, 255],
        };
        let json = serde_json::to_string(&stored).unwrap();
        assert_eq!(json, r#"{"id":"abc","data":"AAEC/w=="}"#);
        assert_eq!(serde_json::from_str::<StoredKey>(&json).unwrap(), stored);
    }

    #[test]
    fn test_debug_redacts_identity() {
        let material = KeyMaterial::generate();
        let debug_output = format!("{:?}", material);
        let secret = material.encode();

        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains(secret.expose_secret()));
    }

    #[test]
    fn test_invalid_encoding_rejected() {
        assert!(matches!(
            KeyMaterial::from_encoded("not-a-key"),
            Err(VaultError::Crypto(_))
        ));
    }
}
