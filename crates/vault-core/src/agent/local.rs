//! In-process key agent.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

use super::encryption::{decrypt_with, encrypt_to};
use super::keys::{KeyMaterial, StoredKey};
use super::{KeyAgent, LockEvent};
use crate::config::{CipherAlgorithm, CryptoParams};
use crate::error::{Result, VaultError};
use crate::events::EventStream;

/// Keeps unlocked keys in process memory for the lifetime of the session.
#[derive(Default)]
pub struct LocalKeyAgent {
    keys: RwLock<Vec<(String, KeyMaterial)>>,
    events: EventStream<LockEvent>,
}

impl LocalKeyAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn key_count(&self) -> usize {
        self.keys.read().await.len()
    }
}

#[async_trait]
impl KeyAgent for LocalKeyAgent {
    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .keys
            .read()
            .await
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn add_key(&self, id: &str, material: KeyMaterial) -> Result<()> {
        let was_locked = {
            let mut keys = self.keys.write().await;
            let was_locked = keys.is_empty();
            match keys.iter_mut().find(|(existing, _)| existing == id) {
                Some(slot) => slot.1 = material,
                None => keys.push((id.to_string(), material)),
            }
            was_locked
        };

        debug!(key_id = id, "key added to agent");
        if was_locked {
            self.events.publish(&LockEvent::Unlocked);
        }
        Ok(())
    }

    async fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        params: &CryptoParams,
    ) -> Result<Vec<u8>> {
        let keys = self.keys.read().await;
        let (_, material) = keys
            .iter()
            .find(|(id, _)| id == key_id)
            .ok_or(VaultError::Locked)?;
        match params.algorithm {
            CipherAlgorithm::AgeX25519 => encrypt_to(plaintext, &material.recipient()),
        }
    }

    async fn decrypt(
        &self,
        key_id: &str,
        ciphertext: &[u8],
        params: &CryptoParams,
    ) -> Result<Vec<u8>> {
        let keys = self.keys.read().await;
        let (_, material) = keys
            .iter()
            .find(|(id, _)| id == key_id)
            .ok_or(VaultError::Locked)?;
        match params.algorithm {
            CipherAlgorithm::AgeX25519 => decrypt_with(ciphertext, material.identity()),
        }
    }

    async fn decrypt_keys(
        &self,
        keys: &[StoredKey],
        password: &str,
    ) -> Result<Vec<(String, KeyMaterial)>> {
        let keys = keys.to_vec();
        let password = Zeroizing::new(password.to_string());
        // scrypt is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            keys.iter()
                .map(|key| Ok((key.id.clone(), key.unseal(&password)?)))
                .collect::<Result<Vec<_>>>()
        })
        .await?
    }

    async fn create_key(&self, password: &str) -> Result<StoredKey> {
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || {
            let material = KeyMaterial::generate();
            StoredKey::seal(StoredKey::new_id(), &material, &password)
        })
        .await?
    }

    async fn lock(&self) -> Result<()> {
        let was_unlocked = {
            let mut keys = self.keys.write().await;
            let was_unlocked = !keys.is_empty();
            keys.clear();
            was_unlocked
        };

        if was_unlocked {
            debug!("key agent locked");
            self.events.publish(&LockEvent::Locked);
        }
        Ok(())
    }

    fn lock_events(&self) -> &EventStream<LockEvent> {
        &self.events
    }
}
