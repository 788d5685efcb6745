//! Encrypted overview index.
//!
//! The index maps item uuid to `Overview` and is persisted as one JSON
//! object (`{"<uuid>": {...}, ...}`), encrypted as a single blob under the
//! active key and stored at `"index"`. It is only ever rewritten whole:
//! `update_index` reads the current document, overlays a batch, and writes
//! the result back. Entries keep the order in which their uuid first
//! appeared.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use crate::agent::KeyAgent;
use crate::config::CryptoParams;
use crate::db::ObjectStore;
use crate::error::Result;
use crate::item::Overview;

/// Key of the index document in the item store.
pub const INDEX_KEY: &str = "index";

/// Insertion-ordered uuid → overview map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverviewIndex {
    entries: Vec<Overview>,
    positions: HashMap<Uuid, usize>,
}

impl OverviewIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&Overview> {
        self.positions.get(uuid).map(|&pos| &self.entries[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overview> {
        self.entries.iter()
    }

    /// Insert or replace one overview. A replaced entry keeps its position.
    pub fn upsert(&mut self, overview: Overview) {
        match self.positions.get(&overview.uuid) {
            Some(&pos) => self.entries[pos] = overview,
            None => {
                self.positions.insert(overview.uuid, self.entries.len());
                self.entries.push(overview);
            }
        }
    }

    /// Overlay `batch` in order; the last overview for a uuid wins.
    pub fn merge<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = Overview>,
    {
        for overview in batch {
            self.upsert(overview);
        }
    }

    pub fn into_overviews(self) -> Vec<Overview> {
        self.entries
    }
}

impl FromIterator<Overview> for OverviewIndex {
    fn from_iter<I: IntoIterator<Item = Overview>>(iter: I) -> Self {
        let mut index = Self::new();
        index.merge(iter);
        index
    }
}

impl Serialize for OverviewIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for overview in &self.entries {
            map.serialize_entry(&overview.uuid, overview)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OverviewIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct IndexVisitor;

        impl<'de> Visitor<'de> for IndexVisitor {
            type Value = OverviewIndex;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of item uuid to overview")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut index = OverviewIndex::new();
                while let Some((key, mut overview)) = access.next_entry::<Uuid, Overview>()? {
                    // The map key is authoritative.
                    overview.uuid = key;
                    index.upsert(overview);
                }
                Ok(index)
            }
        }

        deserializer.deserialize_map(IndexVisitor)
    }
}

/// Read and decrypt the index. A missing document is an empty index.
pub async fn load_index(
    items: &dyn ObjectStore,
    agent: &dyn KeyAgent,
    key_id: &str,
    params: &CryptoParams,
) -> Result<OverviewIndex> {
    let Some(ciphertext) = items.get(INDEX_KEY).await? else {
        return Ok(OverviewIndex::new());
    };
    let plaintext = agent.decrypt(key_id, &ciphertext, params).await?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Encrypt and write the whole index.
pub async fn store_index(
    items: &dyn ObjectStore,
    agent: &dyn KeyAgent,
    key_id: &str,
    params: &CryptoParams,
    index: &OverviewIndex,
) -> Result<()> {
    let plaintext = serde_json::to_vec(index)?;
    let ciphertext = agent.encrypt(key_id, &plaintext, params).await?;
    items.set(INDEX_KEY, ciphertext).await
}

/// Read-modify-write the index with a batch of overviews.
///
/// Tombstoned entries are carried over untouched. There is no concurrency
/// check against other writers; callers serialize through the update queue.
pub async fn update_index(
    items: &dyn ObjectStore,
    agent: &dyn KeyAgent,
    params: &CryptoParams,
    batch: Vec<Overview>,
) -> Result<()> {
    let key_id = agent.active_key().await?;
    let mut index = load_index(items, agent, &key_id, params).await?;
    let batch_size = batch.len();
    index.merge(batch);
    store_index(items, agent, &key_id, params, &index).await?;
    debug!(batch_size, index_size = index.len(), "rewrote overview index");
    Ok(())
}
