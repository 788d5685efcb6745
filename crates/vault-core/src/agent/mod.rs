//! Key agent: holds unlocked keys and performs encryption with them.
//!
//! The item store never sees raw key material. It asks the agent which
//! keys are loaded, hands it password-wrapped keys to unlock, and routes
//! every encrypt/decrypt call through it by key id. An agent with no keys
//! is locked.
//!
//! ## Security Model
//!
//! - Keysets are wrapped with age passphrase (scrypt) encryption
//! - Item content and the index use age X25519 encryption
//! - Key material is zeroized when dropped or when the agent locks
//!
//! We do NOT defend against a compromised process or memory inspection
//! of an unlocked session.

pub mod encryption;
pub mod keys;
pub mod local;
pub mod passphrase;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::config::CryptoParams;
use crate::error::{Result, VaultError};
use crate::events::EventStream;

pub use keys::{KeyMaterial, StoredKey};
pub use local::LocalKeyAgent;
pub use passphrase::validate_password;

/// Lock-state transitions reported by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    Unlocked,
    Locked,
}

/// Key management collaborator used by the item store.
#[async_trait]
pub trait KeyAgent: Send + Sync {
    /// Ids of the loaded keys, in the order they were added.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Load a decrypted key. Re-adding an id replaces its material in place.
    async fn add_key(&self, id: &str, material: KeyMaterial) -> Result<()>;

    /// Encrypt with a loaded key.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Locked` if `key_id` is not loaded.
    async fn encrypt(&self, key_id: &str, plaintext: &[u8], params: &CryptoParams)
        -> Result<Vec<u8>>;

    /// Decrypt with a loaded key.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Locked` if `key_id` is not loaded.
    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext: &[u8],
        params: &CryptoParams,
    ) -> Result<Vec<u8>>;

    /// Unwrap persisted keys with `password` without loading them.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidPassword` if any key fails to decrypt.
    async fn decrypt_keys(
        &self,
        keys: &[StoredKey],
        password: &str,
    ) -> Result<Vec<(String, KeyMaterial)>>;

    /// Generate a new key wrapped under `password`. The key is not loaded.
    async fn create_key(&self, password: &str) -> Result<StoredKey>;

    /// Drop every loaded key.
    async fn lock(&self) -> Result<()>;

    fn lock_events(&self) -> &EventStream<LockEvent>;

    /// The key used for new writes: the first one loaded.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Locked` if no key is loaded.
    async fn active_key(&self) -> Result<String> {
        self.list_keys()
            .await?
            .into_iter()
            .next()
            .ok_or(VaultError::Locked)
    }
}
