//! Versioned key/value database.
//!
//! The item store only talks to the `Database` and `ObjectStore` traits.
//! Two backends are provided:
//! - `SqliteDatabase`: one SQLite file, one table per object store
//! - `MemoryDatabase`: volatile, for tests and scratch sessions

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryDatabase;
pub use sqlite::SqliteDatabase;
pub use traits::{get_json, set_json, Database, ObjectStore, SchemaBuilder, UpgradeFn};
