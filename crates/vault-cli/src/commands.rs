//! Command handlers.

use std::path::Path;

use tracing::info;
use uuid::Uuid;
use vault_core::item::{types, FieldDesignation, FieldKind, ItemField};
use vault_core::{Item, ItemContent, ListItemsOptions};

use crate::cli::{AddArgs, ClearArgs, InitArgs, ListArgs, ShowArgs};
use crate::config::{default_config_path, write_config, VaultConfig};
use crate::errors::{from_vault_error, CliError};
use crate::helpers::{open_existing, open_store, open_unlocked, prompt_new_password};
use crate::output::{item_line, print_item};

const KNOWN_TYPES: &[&str] = &[
    types::LOGIN,
    types::PASSWORD,
    types::SECURE_NOTE,
    types::CREDIT_CARD,
    types::IDENTITY,
];

pub async fn handle_init(
    path: &Path,
    args: &InitArgs,
    write_default_config: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let store = open_store(path).await?;
    if !store.list_keys().await.map_err(from_vault_error)?.is_empty() {
        return Err(CliError::invalid_input(format!(
            "A vault already exists at {}",
            path.display()
        ))
        .into());
    }

    let password = prompt_new_password()?;
    let key_id = store
        .create_vault(&password, &args.hint)
        .await
        .map_err(from_vault_error)?;
    info!(key_id = %key_id, "initialized vault");

    if write_default_config {
        let config_path = default_config_path()?;
        if !config_path.exists() {
            write_config(&config_path, &VaultConfig::new(path))?;
        }
    }

    if !quiet {
        println!("Initialized new vault at {}", path.display());
    }
    Ok(())
}

fn build_item(args: &AddArgs) -> anyhow::Result<Item> {
    if args.title.trim().is_empty() {
        return Err(CliError::invalid_input("Title must not be empty").into());
    }
    if !KNOWN_TYPES.contains(&args.item_type.as_str()) {
        return Err(CliError::invalid_input(format!(
            "Unknown item type: {} (use one of {})",
            args.item_type,
            KNOWN_TYPES.join(", ")
        ))
        .into());
    }

    let mut fields = Vec::new();
    if let Some(username) = &args.username {
        fields.push(
            ItemField::new("username", username.as_str(), FieldKind::Text)
                .designated(FieldDesignation::Username),
        );
    }
    if let Some(password) = &args.password {
        fields.push(
            ItemField::new("password", password.as_str(), FieldKind::Password)
                .designated(FieldDesignation::Password),
        );
    }
    let content = ItemContent {
        fields,
        notes: args.notes.clone().unwrap_or_default(),
        password_history: Vec::new(),
    };

    let mut item = Item::new(args.item_type.as_str(), args.title.trim()).with_content(content);
    for url in &args.urls {
        item = item.with_location(url.as_str());
    }
    item.open_contents.tags = args.tag.clone();
    Ok(item)
}

pub async fn handle_add(path: &Path, args: &AddArgs, quiet: bool) -> anyhow::Result<()> {
    let mut item = build_item(args)?;
    let store = open_unlocked(path).await?;
    store.save_item(&mut item).await.map_err(from_vault_error)?;

    if quiet {
        println!("{}", item.uuid);
    } else {
        println!("Added {}", item_line(&item));
    }
    Ok(())
}

pub async fn handle_list(path: &Path, args: &ListArgs, quiet: bool) -> anyhow::Result<()> {
    let store = open_unlocked(path).await?;
    let options = ListItemsOptions {
        include_tombstones: args.trashed,
    };
    let items = store.list_items(&options).await.map_err(from_vault_error)?;

    if items.is_empty() && !quiet {
        println!("No items found.");
    }
    for item in &items {
        println!("{}", item_line(item));
    }
    Ok(())
}

fn parse_item_id(value: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| CliError::invalid_input(format!("Invalid item ID: {}", value)).into())
}

pub async fn handle_show(path: &Path, args: &ShowArgs, quiet: bool) -> anyhow::Result<()> {
    let uuid = parse_item_id(&args.id)?;
    let store = open_unlocked(path).await?;
    let mut item = store.get_item(&uuid).await.map_err(from_vault_error)?;
    let content = store
        .load_content(&mut item)
        .await
        .map_err(from_vault_error)?
        .clone();
    print_item(&item, &content, quiet);
    Ok(())
}

pub async fn handle_trash(path: &Path, args: &ShowArgs, quiet: bool) -> anyhow::Result<()> {
    let uuid = parse_item_id(&args.id)?;
    let store = open_unlocked(path).await?;
    let mut item = store.get_item(&uuid).await.map_err(from_vault_error)?;
    if item.trashed {
        if !quiet {
            println!("Already trashed: {}", item.title);
        }
        return Ok(());
    }
    store.trash_item(&mut item).await.map_err(from_vault_error)?;
    if !quiet {
        println!("Trashed {}", item_line(&item));
    }
    Ok(())
}

pub async fn handle_hint(path: &Path) -> anyhow::Result<()> {
    let store = open_existing(path).await?;
    match store.password_hint().await.map_err(from_vault_error)? {
        Some(hint) if !hint.is_empty() => println!("{}", hint),
        _ => println!("No password hint set."),
    }
    Ok(())
}

pub async fn handle_clear(path: &Path, args: &ClearArgs, quiet: bool) -> anyhow::Result<()> {
    if !args.yes {
        return Err(CliError::invalid_input(
            "Refusing to delete every key and item without --yes",
        )
        .into());
    }
    let store = open_existing(path).await?;
    store.clear().await.map_err(from_vault_error)?;
    if !quiet {
        println!("Vault cleared.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_args(title: &str, item_type: &str) -> AddArgs {
        AddArgs {
            title: title.to_string(),
            item_type: item_type.to_string(),
            urls: vec!["https://bank.example".to_string()],
            username: Some("alice".to_string()),
            password: Some("s3cret".to_string()),
            notes: None,
            tag: vec!["finance".to_string()],
        }
    }

    #[test]
    fn test_build_item_from_args() {
        let item = build_item(&add_args(" Bank ", "login")).unwrap();
        let content = item.content.as_ref().unwrap();

        assert_eq!(item.title, "Bank");
        assert_eq!(item.locations, vec!["https://bank.example"]);
        assert_eq!(item.open_contents.tags, vec!["finance"]);
        assert_eq!(content.username(), Some("alice"));
        assert_eq!(content.password(), Some("s3cret"));
    }

    #[test]
    fn test_build_item_rejects_unknown_type() {
        let err = build_item(&add_args("Bank", "spaceship")).unwrap_err();
        assert!(err.to_string().contains("Unknown item type"));
    }

    #[test]
    fn test_build_item_rejects_blank_title() {
        assert!(build_item(&add_args("  ", "login")).is_err());
    }

    #[test]
    fn test_parse_item_id() {
        assert!(parse_item_id("not-a-uuid").is_err());
        let uuid = Uuid::new_v4();
        assert_eq!(parse_item_id(&uuid.to_string()).unwrap(), uuid);
    }
}
