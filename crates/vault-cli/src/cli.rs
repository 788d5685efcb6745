use clap::{Args, Parser, Subcommand};

use vault_core::VERSION;

/// Vault - A local, encrypted item store for passwords and secrets
#[derive(Parser)]
#[command(name = "vault")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the vault database
    #[arg(short, long, global = true, env = "VAULT_PATH")]
    pub vault: Option<String>,

    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new vault with a password-protected key
    Init(InitArgs),

    /// Add an item to the vault
    Add(AddArgs),

    /// List items
    List(ListArgs),

    /// Show an item, including its secret fields
    Show(ShowArgs),

    /// Move an item to the trash
    Trash(ShowArgs),

    /// Print the password hint
    Hint,

    /// Delete every key and item in the vault
    Clear(ClearArgs),
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Hint shown by `vault hint`
    #[arg(long, default_value = "")]
    pub hint: String,
}

/// Arguments for the `add` command
#[derive(Args)]
pub struct AddArgs {
    /// Item title
    #[arg(long)]
    pub title: String,

    /// Item type (login, password, secure_note, credit_card, identity)
    #[arg(long = "type", default_value = "login")]
    pub item_type: String,

    /// Site URL; may be repeated
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub password: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Add tags to the item
    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Include trashed items
    #[arg(long)]
    pub trashed: bool,
}

/// Arguments for commands that take an item id
#[derive(Args)]
pub struct ShowArgs {
    /// Item ID (full UUID)
    #[arg(value_name = "ID")]
    pub id: String,
}

/// Arguments for the `clear` command
#[derive(Args)]
pub struct ClearArgs {
    /// Confirm deletion
    #[arg(long)]
    pub yes: bool,
}
