//! # Vault Core
//!
//! Core library for Vault - an encrypted item store for a password manager.
//!
//! Items are split in two: a small `Overview` (title, type, locations,
//! timestamps) collected into one encrypted index document, and the secret
//! `ItemContent` encrypted per item. Keys live in a `KeyAgent`; the store
//! only ever refers to them by id.
//!
//! ## Architecture
//!
//! - **agent**: key agent trait, in-process agent, age encryption
//! - **db**: object store and database traits, SQLite and in-memory backends
//! - **index**: the encrypted overview index
//! - **queue**: batched, serialized index updates
//! - **events**: listener registry for store and agent events
//! - **store**: `ItemStore`, which ties the above together

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod index;
pub mod item;
pub mod queue;
pub mod store;

pub use agent::{KeyAgent, LocalKeyAgent, LockEvent, StoredKey};
pub use config::{ListItemsOptions, StoreConfig};
pub use error::{Result, VaultError};
pub use events::{EventStream, ListenerContext};
pub use item::{Item, ItemContent, Overview};
pub use store::ItemStore;

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
