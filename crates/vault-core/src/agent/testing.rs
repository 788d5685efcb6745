//! Transparent key agent for unit tests.
//!
//! "Encryption" tags the plaintext with the key id so tests can see which
//! key was used, and "sealing" stores the password itself. Avoids paying
//! scrypt costs in every store test.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::keys::{KeyMaterial, StoredKey};
use super::{KeyAgent, LockEvent};
use crate::config::CryptoParams;
use crate::error::{Result, VaultError};
use crate::events::EventStream;

#[derive(Default)]
pub(crate) struct PlainKeyAgent {
    keys: RwLock<Vec<String>>,
    events: EventStream<LockEvent>,
}

impl PlainKeyAgent {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stored_key(id: &str, password: &str) -> StoredKey {
        StoredKey {
            id: id.to_string(),
            data: password.as_bytes().to_vec(),
        }
    }

    async fn require(&self, key_id: &str) -> Result<()> {
        if self.keys.read().await.iter().any(|id| id == key_id) {
            Ok(())
        } else {
            Err(VaultError::Locked)
        }
    }
}

#[async_trait]
impl KeyAgent for PlainKeyAgent {
    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.keys.read().await.clone())
    }

    async fn add_key(&self, id: &str, _material: KeyMaterial) -> Result<()> {
        let mut keys = self.keys.write().await;
        if !keys.iter().any(|existing| existing == id) {
            keys.push(id.to_string());
        }
        Ok(())
    }

    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        _params: &CryptoParams,
    ) -> Result<Vec<u8>> {
        self.require(key_id).await?;
        let mut out = format!("{}:", key_id).into_bytes();
        out.extend_from_slice(plaintext);
        Ok(out)
    }

    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext: &[u8],
        _params: &CryptoParams,
    ) -> Result<Vec<u8>> {
        self.require(key_id).await?;
        let tag = format!("{}:", key_id);
        ciphertext
            .strip_prefix(tag.as_bytes())
            .map(|plaintext| plaintext.to_vec())
            .ok_or_else(|| VaultError::Crypto("Data was not encrypted with this key".to_string()))
    }

    async fn decrypt_keys(
        &self,
        keys: &[StoredKey],
        password: &str,
    ) -> Result<Vec<(String, KeyMaterial)>> {
        keys.iter()
            .map(|key| {
                if key.data == password.as_bytes() {
                    Ok((key.id.clone(), KeyMaterial::generate()))
                } else {
                    Err(VaultError::InvalidPassword)
                }
            })
            .collect()
    }

    async fn create_key(&self, password: &str) -> Result<StoredKey> {
        Ok(Self::stored_key(&StoredKey::new_id(), password))
    }

    async fn lock(&self) -> Result<()> {
        self.keys.write().await.clear();
        self.events.publish(&LockEvent::Locked);
        Ok(())
    }

    fn lock_events(&self) -> &EventStream<LockEvent> {
        &self.events
    }
}
