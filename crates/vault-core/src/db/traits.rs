//! Key/value database traits.
//!
//! A `Database` is a versioned collection of named object stores. Stores
//! are created by an upgrade callback when the database is opened at a
//! newer schema version than it was last written with. Values are opaque
//! bytes; `get_json`/`set_json` layer serde on top.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, VaultError};

/// A flat namespace of byte values addressed by string keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the value under `key`, or `None` if it was never set.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, in ascending order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// A versioned set of object stores.
#[async_trait]
pub trait Database: Send + Sync {
    /// Schema version the database was opened at.
    fn schema_version(&self) -> u32;

    /// Handle to the store called `name`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotFound` if the schema never created it.
    fn store(&self, name: &str) -> Result<Arc<dyn ObjectStore>>;

    /// Drop every store and reset the recorded version to 0.
    ///
    /// Handles obtained from `store` keep their names; they fail until the
    /// schema is recreated by `initialize`.
    async fn delete(&self) -> Result<()>;

    /// Run the upgrade callback from the recorded version up to
    /// `schema_version`. A no-op when already current.
    async fn initialize(&self) -> Result<()>;
}

/// Store-level changes requested by an upgrade callback.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    created: Vec<String>,
    dropped: Vec<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object store. Creating an existing store is a no-op.
    pub fn create_store(&mut self, name: &str) -> Result<()> {
        validate_store_name(name)?;
        self.dropped.retain(|dropped| dropped != name);
        if !self.created.iter().any(|created| created == name) {
            self.created.push(name.to_string());
        }
        Ok(())
    }

    /// Drop an object store and its contents.
    pub fn drop_store(&mut self, name: &str) -> Result<()> {
        validate_store_name(name)?;
        self.created.retain(|created| created != name);
        if !self.dropped.iter().any(|dropped| dropped == name) {
            self.dropped.push(name.to_string());
        }
        Ok(())
    }

    pub fn created(&self) -> &[String] {
        &self.created
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

/// Called as `upgrade(old_version, new_version, &mut schema)`.
pub type UpgradeFn = Arc<dyn Fn(u32, u32, &mut SchemaBuilder) -> Result<()> + Send + Sync>;

/// Store names become SQL identifiers, so keep them to `[a-z0-9_]`.
pub fn validate_store_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(VaultError::Validation(format!(
            "Invalid object store name: {:?}",
            name
        )));
    }
    Ok(())
}

/// Fetch and deserialize a JSON value.
pub async fn get_json<T>(store: &dyn ObjectStore, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub async fn set_json<T>(store: &dyn ObjectStore, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized + Sync,
{
    let bytes = serde_json::to_vec(value)?;
    store.set(key, bytes).await
}
