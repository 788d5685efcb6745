//! Error types for vault core operations.
//!
//! Errors are descriptive at the core level; the CLI layer maps these to
//! user-facing messages. Every variant carries owned data only, so a single
//! failure can be handed to several waiters (see the batched update queue).

use thiserror::Error;

/// Result type alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Core error type for vault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// No active key is available; the vault has not been unlocked
    #[error("Vault is locked")]
    Locked,

    /// Unlock was attempted but no keyset has been persisted
    #[error("No keys have been saved for this vault")]
    NoKeys,

    /// The keyset could not be decrypted with the supplied password
    #[error("Invalid password")]
    InvalidPassword,

    /// Requested item or content is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation is deliberately unsupported
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Underlying database failure, message kept as reported
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encryption or decryption error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Malformed input or persisted document
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic error (fallback)
    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for VaultError {
    fn from(err: rusqlite::Error) -> Self {
        VaultError::Storage(format!("SQLite error: {}", err))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Validation(err.to_string())
    }
}

impl From<tokio::task::JoinError> for VaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        VaultError::Other(format!("Background task failed: {}", err))
    }
}
