//! Output formatting helpers for the CLI.

use vault_core::item::{FieldKind, ItemContent};
use vault_core::Item;

/// One `uuid  title` line per item; trashed items are marked.
pub fn item_line(item: &Item) -> String {
    if item.trashed {
        format!("{}  {} (trashed)", item.uuid, item.title)
    } else {
        format!("{}  {}", item.uuid, item.title)
    }
}

/// Print a single item in human-readable format.
pub fn print_item(item: &Item, content: &ItemContent, quiet: bool) {
    if !quiet {
        println!("ID: {}", item.uuid);
        println!("Type: {}", item.type_name);
        println!("Created: {}", item.created_at);
        println!("Updated: {}", item.updated_at);
        if item.trashed {
            println!("Trashed: yes");
        }
        for location in &item.locations {
            println!("URL: {}", location);
        }
        if !item.open_contents.tags.is_empty() {
            println!("Tags: {}", item.open_contents.tags.join(", "));
        }
        println!();
    }
    println!("Title: {}", item.title);
    for field in &content.fields {
        println!("{}: {}", field_label(&field.name, field.kind), field.value);
    }
    if !content.notes.is_empty() {
        println!();
        println!("{}", content.notes);
    }
}

fn field_label(name: &str, kind: FieldKind) -> String {
    match kind {
        FieldKind::Password => format!("{} (password)", name),
        FieldKind::Totp => format!("{} (totp)", name),
        _ => name.to_string(),
    }
}
