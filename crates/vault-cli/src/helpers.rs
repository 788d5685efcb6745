//! Password prompts and store opening for the CLI.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use dialoguer::Password;
use tracing::debug;
use vault_core::{ItemStore, LocalKeyAgent, StoreConfig};
use zeroize::Zeroizing;

use crate::constants::PASSWORD_ENV;
use crate::errors::{from_vault_error, CliError};

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(Zeroizing::new)
}

/// Prompt for the vault password, or read it from VAULT_PASSWORD.
pub fn prompt_password() -> anyhow::Result<Zeroizing<String>> {
    if let Some(password) = password_from_env() {
        return Ok(password);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::auth_failed(format!(
            "No password provided and no TTY available. Set {}.",
            PASSWORD_ENV
        ))
        .into());
    }
    Password::new()
        .with_prompt("Password")
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))
}

/// Prompt for a new password with confirmation (for init), or read it from
/// VAULT_PASSWORD.
pub fn prompt_new_password() -> anyhow::Result<Zeroizing<String>> {
    if let Some(password) = password_from_env() {
        return Ok(password);
    }
    Password::new()
        .with_prompt("Choose a password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))
}

/// Open the store at `path`. Does not unlock.
pub async fn open_store(path: &Path) -> anyhow::Result<ItemStore> {
    debug!(path = %path.display(), "opening vault");
    let agent = Arc::new(LocalKeyAgent::new());
    ItemStore::open_sqlite(path, agent, StoreConfig::default())
        .await
        .map_err(from_vault_error)
}

/// Open a store that must already exist. Does not unlock.
pub async fn open_existing(path: &Path) -> anyhow::Result<ItemStore> {
    if !path.exists() {
        return Err(CliError::not_found(
            format!("No vault found at {}", path.display()),
            "Run:\n  vault init\n\nOr specify a vault path:\n  VAULT_PATH=/path/to/vault.db vault init",
        )
        .into());
    }
    open_store(path).await
}

/// Open an existing store and unlock it with the user's password.
pub async fn open_unlocked(path: &Path) -> anyhow::Result<ItemStore> {
    let store = open_existing(path).await?;
    if store.list_keys().await.map_err(from_vault_error)?.is_empty() {
        return Err(from_vault_error(vault_core::VaultError::NoKeys));
    }
    let password = prompt_password()?;
    store.unlock(&password).await.map_err(from_vault_error)?;
    Ok(store)
}
