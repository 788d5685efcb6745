//! Item store: encrypted items, the overview index, and the keyset.
//!
//! Persisted layout, in two object stores:
//!
//! | store      | key              | value                                 |
//! |------------|------------------|---------------------------------------|
//! | `keystore` | `key/{id}`       | `StoredKey` JSON (password-wrapped)   |
//! | `keystore` | `hint`           | password hint, JSON string            |
//! | `items`    | `index`          | overview index, encrypted             |
//! | `items`    | `content/{uuid}` | `ItemContent` JSON, encrypted         |
//!
//! All index writes go through one `BatchedUpdateQueue`, so concurrent
//! saves in this process never race on the index document.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{validate_password, KeyAgent, StoredKey};
use crate::config::{ListItemsOptions, StoreConfig};
use crate::db::{get_json, set_json, Database, ObjectStore, SchemaBuilder, SqliteDatabase};
use crate::error::{Result, VaultError};
use crate::events::EventStream;
use crate::index::{load_index, update_index};
use crate::item::{Item, ItemContent, Overview};
use crate::queue::BatchedUpdateQueue;

/// Current schema version of the item database.
pub const SCHEMA_VERSION: u32 = 1;

pub const KEYSTORE: &str = "keystore";
pub const ITEM_STORE: &str = "items";

const KEY_PREFIX: &str = "key/";
const HINT_KEY: &str = "hint";
const CONTENT_PREFIX: &str = "content/";

/// Schema upgrade callback for the item database.
pub fn upgrade_schema(old_version: u32, _new_version: u32, schema: &mut SchemaBuilder) -> Result<()> {
    if old_version < 1 {
        schema.create_store(KEYSTORE)?;
        schema.create_store(ITEM_STORE)?;
    }
    Ok(())
}

fn content_key(uuid: &Uuid) -> String {
    format!("{}{}", CONTENT_PREFIX, uuid)
}

fn key_entry(id: &str) -> String {
    format!("{}{}", KEY_PREFIX, id)
}

pub struct ItemStore {
    database: Arc<dyn Database>,
    agent: Arc<dyn KeyAgent>,
    keystore: Arc<dyn ObjectStore>,
    items: Arc<dyn ObjectStore>,
    config: StoreConfig,
    index_updates: BatchedUpdateQueue<Overview>,
    item_updated: EventStream<Item>,
    unlocked: EventStream<()>,
}

impl ItemStore {
    /// Build a store over an already opened database.
    ///
    /// Must be called from within a Tokio runtime: the index update
    /// worker is spawned here.
    pub fn new(
        database: Arc<dyn Database>,
        agent: Arc<dyn KeyAgent>,
        config: StoreConfig,
    ) -> Result<Self> {
        let keystore = database.store(KEYSTORE)?;
        let items = database.store(ITEM_STORE)?;

        let flush_items = Arc::clone(&items);
        let flush_agent = Arc::clone(&agent);
        let params = config.crypto;
        let index_updates = BatchedUpdateQueue::new(move |batch: Vec<Overview>| {
            let items = Arc::clone(&flush_items);
            let agent = Arc::clone(&flush_agent);
            async move { update_index(items.as_ref(), agent.as_ref(), &params, batch).await }
        });

        Ok(Self {
            database,
            agent,
            keystore,
            items,
            config,
            index_updates,
            item_updated: EventStream::new(),
            unlocked: EventStream::new(),
        })
    }

    /// Open (or create) a SQLite-backed store at `path`.
    pub async fn open_sqlite(
        path: &Path,
        agent: Arc<dyn KeyAgent>,
        config: StoreConfig,
    ) -> Result<Self> {
        let database =
            SqliteDatabase::open(path, SCHEMA_VERSION, Arc::new(upgrade_schema)).await?;
        Self::new(Arc::new(database), agent, config)
    }

    pub fn agent(&self) -> &Arc<dyn KeyAgent> {
        &self.agent
    }

    /// Fires after every successful `save_item`.
    pub fn on_item_updated(&self) -> &EventStream<Item> {
        &self.item_updated
    }

    /// Fires after every successful `unlock`.
    pub fn on_unlock(&self) -> &EventStream<()> {
        &self.unlocked
    }

    pub async fn is_locked(&self) -> Result<bool> {
        Ok(self.agent.list_keys().await?.is_empty())
    }

    // --- Keys ---

    /// Every persisted key.
    pub async fn list_keys(&self) -> Result<Vec<StoredKey>> {
        let mut keys = Vec::new();
        for entry in self.keystore.list(KEY_PREFIX).await? {
            if let Some(key) = get_json::<StoredKey>(self.keystore.as_ref(), &entry).await? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    /// Persist `keys` and the password hint.
    ///
    /// All writes are issued concurrently; this resolves once every one
    /// has finished and reports the first failure, if any.
    pub async fn save_keys(&self, keys: &[StoredKey], hint: &str) -> Result<()> {
        let mut writes = JoinSet::new();
        for key in keys {
            let keystore = Arc::clone(&self.keystore);
            let key = key.clone();
            writes.spawn(async move {
                set_json(keystore.as_ref(), &key_entry(&key.id), &key).await
            });
        }
        let keystore = Arc::clone(&self.keystore);
        let hint = hint.to_string();
        writes.spawn(async move { set_json(keystore.as_ref(), HINT_KEY, &hint).await });

        let mut first_error = None;
        while let Some(joined) = writes.join_next().await {
            let outcome = joined.map_err(VaultError::from).and_then(|result| result);
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => {
                debug!(count = keys.len(), "saved keyset");
                Ok(())
            }
        }
    }

    /// The stored password hint, if one was ever saved.
    pub async fn password_hint(&self) -> Result<Option<String>> {
        get_json(self.keystore.as_ref(), HINT_KEY).await
    }

    /// Generate the vault's first key, sealed under `password`.
    ///
    /// Does not unlock the vault. Returns the new key id.
    pub async fn create_vault(&self, password: &str, hint: &str) -> Result<String> {
        validate_password(password, self.config.min_password_length)?;
        if !self.keystore.list(KEY_PREFIX).await?.is_empty() {
            return Err(VaultError::Validation(
                "Vault already has a keyset".to_string(),
            ));
        }

        let key = self.agent.create_key(password).await?;
        self.save_keys(std::slice::from_ref(&key), hint).await?;
        info!(key_id = %key.id, "created vault keyset");
        Ok(key.id)
    }

    /// Decrypt the persisted keyset with `password` and load it into the
    /// agent. Safe to call again while unlocked.
    ///
    /// # Errors
    ///
    /// - `VaultError::NoKeys` if no keyset was saved
    /// - `VaultError::InvalidPassword` if the password is wrong; the agent
    ///   is left untouched
    pub async fn unlock(&self, password: &str) -> Result<()> {
        let keys = self.list_keys().await?;
        if keys.is_empty() {
            return Err(VaultError::NoKeys);
        }

        let decrypted = self.agent.decrypt_keys(&keys, password).await?;
        let count = decrypted.len();
        for (id, material) in decrypted {
            self.agent.add_key(&id, material).await?;
        }

        info!(keys = count, "vault unlocked");
        self.unlocked.publish(&());
        Ok(())
    }

    // --- Items ---

    /// List items from the overview index, in index order.
    ///
    /// Returned items have no content loaded.
    pub async fn list_items(&self, options: &ListItemsOptions) -> Result<Vec<Item>> {
        let key_id = self.agent.active_key().await?;
        let index = load_index(
            self.items.as_ref(),
            self.agent.as_ref(),
            &key_id,
            &self.config.crypto,
        )
        .await?;

        Ok(index
            .into_overviews()
            .into_iter()
            .filter(|overview| options.include_tombstones || !overview.trashed)
            .map(Item::from)
            .collect())
    }

    /// Look up a single item in the index, tombstones included.
    pub async fn get_item(&self, uuid: &Uuid) -> Result<Item> {
        let key_id = self.agent.active_key().await?;
        let index = load_index(
            self.items.as_ref(),
            self.agent.as_ref(),
            &key_id,
            &self.config.crypto,
        )
        .await?;

        index
            .get(uuid)
            .cloned()
            .map(Item::from)
            .ok_or_else(|| VaultError::NotFound(format!("Item {}", uuid)))
    }

    /// Fetch and decrypt the item's secret content.
    pub async fn get_content(&self, item: &Item) -> Result<ItemContent> {
        let key_id = self.agent.active_key().await?;
        let ciphertext = self
            .items
            .get(&content_key(&item.uuid))
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("Content for item {}", item.uuid)))?;
        let plaintext = self
            .agent
            .decrypt(&key_id, &ciphertext, &self.config.crypto)
            .await?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Fetch the content into `item.content` unless it is already loaded.
    pub async fn load_content<'a>(&self, item: &'a mut Item) -> Result<&'a ItemContent> {
        if item.content.is_none() {
            item.content = Some(self.get_content(item).await?);
        }
        item.content
            .as_ref()
            .ok_or_else(|| VaultError::Other("Item content missing after load".to_string()))
    }

    async fn write_content(&self, key_id: &str, uuid: &Uuid, content: &ItemContent) -> Result<()> {
        let plaintext = serde_json::to_vec(content)?;
        let ciphertext = self
            .agent
            .encrypt(key_id, &plaintext, &self.config.crypto)
            .await?;
        self.items.set(&content_key(uuid), ciphertext).await
    }

    /// Content to persist for `item`: what is loaded, else what is stored,
    /// else empty for an item that was never saved.
    async fn current_content(&self, item: &Item) -> Result<ItemContent> {
        if let Some(content) = &item.content {
            return Ok(content.clone());
        }
        match self.get_content(item).await {
            Ok(content) => Ok(content),
            Err(VaultError::NotFound(_)) => Ok(ItemContent::default()),
            Err(err) => Err(err),
        }
    }

    /// Stamp, encrypt and persist `item`, then update its index entry.
    ///
    /// An item without loaded content keeps its stored content; the fetched
    /// content is left loaded on `item`.
    ///
    /// The content write and the index update run concurrently and are not
    /// atomic: if one fails after the other succeeded the error is returned
    /// and the successful write is kept. The next successful save of the
    /// item brings both back in line.
    pub async fn save_item(&self, item: &mut Item) -> Result<()> {
        let key_id = self.agent.active_key().await?;
        let content = self.current_content(item).await?;
        item.updated_at = Utc::now();
        let overview = item.overview();

        let (written, index) = tokio::join!(
            self.write_content(&key_id, &item.uuid, &content),
            self.index_updates.push(overview)
        );
        item.content = Some(content);

        match (written, index) {
            (Ok(()), Ok(())) => {}
            (Err(err), Ok(())) => {
                warn!(uuid = %item.uuid, error = %err, "content write failed after index update");
                return Err(err);
            }
            (Ok(()), Err(err)) => {
                warn!(uuid = %item.uuid, error = %err, "index update failed after content write");
                return Err(err);
            }
            (Err(err), Err(_)) => return Err(err),
        }

        debug!(uuid = %item.uuid, "saved item");
        self.item_updated.publish(item);
        Ok(())
    }

    /// Mark `item` as trashed and save it. The tombstone stays indexed.
    pub async fn trash_item(&self, item: &mut Item) -> Result<()> {
        item.trashed = true;
        self.save_item(item).await
    }

    // --- Maintenance ---

    /// Delete everything and recreate empty stores.
    ///
    /// Keys already loaded into the agent are left alone; lock the agent
    /// separately.
    pub async fn clear(&self) -> Result<()> {
        self.database.delete().await?;
        self.database.initialize().await?;
        info!("vault database cleared");
        Ok(())
    }

    /// Unencrypted export is not offered.
    pub async fn export_raw_data(&self) -> Result<Vec<u8>> {
        Err(VaultError::NotImplemented("raw data export".to_string()))
    }
}
