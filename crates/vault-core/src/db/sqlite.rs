//! SQLite database backend.
//!
//! Each object store is a two-column table `store_<name>`. The schema
//! version lives in `PRAGMA user_version`. rusqlite is blocking, so every
//! call runs on Tokio's blocking pool against a single shared connection.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::traits::{validate_store_name, Database, ObjectStore, SchemaBuilder, UpgradeFn};
use crate::error::{Result, VaultError};

const TABLE_PREFIX: &str = "store_";

type SharedConnection = Arc<Mutex<Connection>>;
type KnownStores = Arc<Mutex<BTreeSet<String>>>;

fn lock_conn(conn: &SharedConnection) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| VaultError::Storage("SQLite connection lock poisoned".to_string()))
}

fn lock_stores(stores: &KnownStores) -> Result<MutexGuard<'_, BTreeSet<String>>> {
    stores
        .lock()
        .map_err(|_| VaultError::Storage("Store registry lock poisoned".to_string()))
}

/// Run `f` against the connection on the blocking pool.
async fn with_conn<R, F>(conn: &SharedConnection, f: F) -> Result<R>
where
    F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let mut guard = lock_conn(&conn)?;
        f(&mut guard)
    })
    .await?
}

fn table_name(store: &str) -> String {
    format!("\"{}{}\"", TABLE_PREFIX, store)
}

fn user_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    u32::try_from(version)
        .map_err(|_| VaultError::Storage(format!("Invalid schema version: {}", version)))
}

fn existing_stores(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, length(?1)) = ?1",
    )?;
    let rows = stmt.query_map([TABLE_PREFIX], |row| row.get::<_, String>(0))?;
    let mut stores = BTreeSet::new();
    for name in rows {
        let name = name?;
        stores.insert(name[TABLE_PREFIX.len()..].to_string());
    }
    Ok(stores)
}

/// Bring the schema up to `target`, returning the stores that now exist.
fn migrate(conn: &mut Connection, target: u32, upgrade: &UpgradeFn) -> Result<BTreeSet<String>> {
    let current = user_version(conn)?;
    if current > target {
        return Err(VaultError::Storage(format!(
            "Database schema version {} is newer than supported version {}",
            current, target
        )));
    }

    if current < target {
        let mut schema = SchemaBuilder::new();
        upgrade(current, target, &mut schema)?;

        let tx = conn.transaction()?;
        for name in schema.dropped() {
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", table_name(name)))?;
        }
        for name in schema.created() {
            tx.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value BLOB NOT NULL);",
                table_name(name)
            ))?;
        }
        // PRAGMA does not accept bound parameters.
        tx.execute_batch(&format!("PRAGMA user_version = {};", target))?;
        tx.commit()?;
        debug!(from = current, to = target, "upgraded database schema");
    }

    existing_stores(conn)
}

/// Database backed by a single SQLite file (or an in-memory connection).
pub struct SqliteDatabase {
    conn: SharedConnection,
    path: Option<PathBuf>,
    schema_version: u32,
    upgrade: UpgradeFn,
    stores: KnownStores,
}

impl SqliteDatabase {
    /// Open (or create) the database at `path` and upgrade it to
    /// `schema_version`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Storage` if the file cannot be opened or was
    /// written by a newer schema version.
    pub async fn open(path: &Path, schema_version: u32, upgrade: UpgradeFn) -> Result<Self> {
        let owned = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            if let Some(parent) = owned.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Ok(Connection::open(&owned)?)
        })
        .await??;
        Self::from_connection(conn, Some(path.to_path_buf()), schema_version, upgrade).await
    }

    /// Open a private in-memory database.
    pub async fn open_in_memory(schema_version: u32, upgrade: UpgradeFn) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None, schema_version, upgrade).await
    }

    async fn from_connection(
        conn: Connection,
        path: Option<PathBuf>,
        schema_version: u32,
        upgrade: UpgradeFn,
    ) -> Result<Self> {
        let conn = Arc::new(Mutex::new(conn));
        let migrate_with = Arc::clone(&upgrade);
        let stores = with_conn(&conn, move |conn| {
            migrate(conn, schema_version, &migrate_with)
        })
        .await?;

        Ok(Self {
            conn,
            path,
            schema_version,
            upgrade,
            stores: Arc::new(Mutex::new(stores)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn store(&self, name: &str) -> Result<Arc<dyn ObjectStore>> {
        validate_store_name(name)?;
        if !lock_stores(&self.stores)?.contains(name) {
            return Err(VaultError::NotFound(format!("Object store {}", name)));
        }
        Ok(Arc::new(SqliteObjectStore {
            name: name.to_string(),
            table: table_name(name),
            conn: Arc::clone(&self.conn),
        }))
    }

    async fn delete(&self) -> Result<()> {
        with_conn(&self.conn, |conn| {
            let stores = existing_stores(conn)?;
            let tx = conn.transaction()?;
            for name in &stores {
                tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", table_name(name)))?;
            }
            tx.execute_batch("PRAGMA user_version = 0;")?;
            tx.commit()?;
            conn.execute_batch("VACUUM;")?;
            Ok(())
        })
        .await?;
        lock_stores(&self.stores)?.clear();
        debug!(path = ?self.path, "deleted database contents");
        Ok(())
    }

    async fn initialize(&self) -> Result<()> {
        let schema_version = self.schema_version;
        let upgrade = Arc::clone(&self.upgrade);
        let stores = with_conn(&self.conn, move |conn| {
            migrate(conn, schema_version, &upgrade)
        })
        .await?;
        *lock_stores(&self.stores)? = stores;
        Ok(())
    }
}

struct SqliteObjectStore {
    name: String,
    table: String,
    conn: SharedConnection,
}

#[async_trait]
impl ObjectStore for SqliteObjectStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.table);
        let key = key.to_string();
        with_conn(&self.conn, move |conn| {
            Ok(conn
                .query_row(&sql, params![key], |row| row.get::<_, Vec<u8>>(0))
                .optional()?)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            self.table
        );
        let key = key.to_string();
        with_conn(&self.conn, move |conn| {
            conn.execute(&sql, params![key, value])?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.table);
        let key = key.to_string();
        with_conn(&self.conn, move |conn| {
            conn.execute(&sql, params![key])?;
            Ok(())
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // substr comparison avoids LIKE wildcard escaping.
        let sql = format!(
            "SELECT key FROM {} WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            self.table
        );
        let prefix = prefix.to_string();
        with_conn(&self.conn, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for key in rows {
                keys.push(key?);
            }
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn item_schema() -> UpgradeFn {
        Arc::new(|old: u32, _new: u32, schema: &mut SchemaBuilder| -> Result<()> {
            if old < 1 {
                schema.create_store("keystore")?;
                schema.create_store("items")?;
            }
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.sqlite");

        {
            let db = SqliteDatabase::open(&path, 1, item_schema()).await.unwrap();
            let items = db.store("items").unwrap();
            items.set("content/a", vec![0xde, 0xad]).await.unwrap();
            items.set("content/a", vec![0xbe, 0xef]).await.unwrap();
        }

        let db = SqliteDatabase::open(&path, 1, item_schema()).await.unwrap();
        let items = db.store("items").unwrap();
        assert_eq!(items.get("content/a").await.unwrap(), Some(vec![0xbe, 0xef]));
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_list_prefix_is_literal() {
        let db = SqliteDatabase::open_in_memory(1, item_schema()).await.unwrap();
        let keystore = db.store("keystore").unwrap();
        for key in ["key/2", "key/1", "key_x", "hint", "key%/3"] {
            keystore.set(key, vec![0]).await.unwrap();
        }

        assert_eq!(
            keystore.list("key/").await.unwrap(),
            vec!["key/1".to_string(), "key/2".to_string()]
        );
        assert_eq!(keystore.list("key%").await.unwrap(), vec!["key%/3".to_string()]);
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let db = SqliteDatabase::open_in_memory(1, item_schema()).await.unwrap();
        let items = db.store("items").unwrap();
        items.remove("nothing").await.unwrap();
        assert_eq!(items.get("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upgrade_runs_only_when_version_increases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.sqlite");
        let calls = Arc::new(Mutex::new(Vec::new()));

        let recorder = |calls: Arc<Mutex<Vec<(u32, u32)>>>| -> UpgradeFn {
            Arc::new(move |old: u32, new: u32, schema: &mut SchemaBuilder| -> Result<()> {
                calls.lock().unwrap().push((old, new));
                if old < 1 {
                    schema.create_store("items")?;
                }
                if old < 2 {
                    schema.create_store("icons")?;
                }
                Ok(())
            })
        };

        SqliteDatabase::open(&path, 1, recorder(Arc::clone(&calls)))
            .await
            .unwrap();
        SqliteDatabase::open(&path, 1, recorder(Arc::clone(&calls)))
            .await
            .unwrap();
        let db = SqliteDatabase::open(&path, 2, recorder(Arc::clone(&calls)))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), vec![(0, 1), (1, 2)]);
        assert!(db.store("icons").is_ok());
    }

    #[tokio::test]
    async fn test_newer_schema_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vault.sqlite");

        SqliteDatabase::open(&path, 3, item_schema()).await.unwrap();
        let result = SqliteDatabase::open(&path, 1, item_schema()).await;

        assert!(matches!(result, Err(VaultError::Storage(_))));
    }

    #[tokio::test]
    async fn test_delete_and_initialize() {
        let db = SqliteDatabase::open_in_memory(1, item_schema()).await.unwrap();
        let items = db.store("items").unwrap();
        items.set("index", vec![1]).await.unwrap();

        db.delete().await.unwrap();
        assert!(matches!(db.store("items"), Err(VaultError::NotFound(_))));
        assert!(items.get("index").await.is_err());

        db.initialize().await.unwrap();
        assert_eq!(items.get("index").await.unwrap(), None);
        assert!(db.store("keystore").is_ok());
    }
}
