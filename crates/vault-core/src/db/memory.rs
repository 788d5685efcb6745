//! In-memory database backend.
//!
//! Same semantics as the SQLite backend, nothing persisted. Used for
//! tests and for throwaway sessions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{validate_store_name, Database, ObjectStore, SchemaBuilder, UpgradeFn};
use crate::error::{Result, VaultError};

#[derive(Default)]
struct MemoryState {
    version: u32,
    stores: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
}

type SharedState = Arc<Mutex<MemoryState>>;

fn lock(state: &SharedState) -> Result<MutexGuard<'_, MemoryState>> {
    state
        .lock()
        .map_err(|_| VaultError::Storage("Memory database lock poisoned".to_string()))
}

/// Volatile database keeping every store in a `BTreeMap`.
pub struct MemoryDatabase {
    state: SharedState,
    schema_version: u32,
    upgrade: UpgradeFn,
}

impl MemoryDatabase {
    pub fn open(schema_version: u32, upgrade: UpgradeFn) -> Result<Self> {
        let db = Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            schema_version,
            upgrade,
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let mut state = lock(&self.state)?;
        if state.version >= self.schema_version {
            return Ok(());
        }

        let mut schema = SchemaBuilder::new();
        (self.upgrade)(state.version, self.schema_version, &mut schema)?;
        for name in schema.dropped() {
            state.stores.remove(name);
        }
        for name in schema.created() {
            state.stores.entry(name.clone()).or_default();
        }
        state.version = self.schema_version;
        Ok(())
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn store(&self, name: &str) -> Result<Arc<dyn ObjectStore>> {
        validate_store_name(name)?;
        if !lock(&self.state)?.stores.contains_key(name) {
            return Err(VaultError::NotFound(format!("Object store {}", name)));
        }
        Ok(Arc::new(MemoryObjectStore {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn delete(&self) -> Result<()> {
        let mut state = lock(&self.state)?;
        state.stores.clear();
        state.version = 0;
        Ok(())
    }

    async fn initialize(&self) -> Result<()> {
        self.migrate()
    }
}

struct MemoryObjectStore {
    name: String,
    state: SharedState,
}

impl MemoryObjectStore {
    fn missing(&self) -> VaultError {
        VaultError::Storage(format!("Object store {} does not exist", self.name))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = lock(&self.state)?;
        let store = state.stores.get(&self.name).ok_or_else(|| self.missing())?;
        Ok(store.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut state = lock(&self.state)?;
        let store = state
            .stores
            .get_mut(&self.name)
            .ok_or_else(|| self.missing())?;
        store.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut state = lock(&self.state)?;
        let store = state
            .stores
            .get_mut(&self.name)
            .ok_or_else(|| self.missing())?;
        store.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let state = lock(&self.state)?;
        let store = state.stores.get(&self.name).ok_or_else(|| self.missing())?;
        Ok(store
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
