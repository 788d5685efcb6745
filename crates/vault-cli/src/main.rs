//! Vault CLI - A local, encrypted item store for passwords and secrets
//!
//! This is the command-line interface for Vault. It opens the SQLite-backed
//! item store, unlocks it with the user's password, and runs one command.

mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod helpers;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::{load_config, resolve_vault_path, DEFAULT_LOG_FILTER};
use errors::CliError;

fn init_tracing(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(
        config
            .as_ref()
            .and_then(|config| config.logging.filter.as_deref()),
    );

    let path = resolve_vault_path(cli.vault.as_deref(), config.as_ref())?;

    match &cli.command {
        Commands::Init(args) => {
            commands::handle_init(&path, args, cli.vault.is_none(), cli.quiet).await
        }
        Commands::Add(args) => commands::handle_add(&path, args, cli.quiet).await,
        Commands::List(args) => commands::handle_list(&path, args, cli.quiet).await,
        Commands::Show(args) => commands::handle_show(&path, args, cli.quiet).await,
        Commands::Trash(args) => commands::handle_trash(&path, args, cli.quiet).await,
        Commands::Hint => commands::handle_hint(&path).await,
        Commands::Clear(args) => commands::handle_clear(&path, args, cli.quiet).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<CliError>() {
            Some(cli_err) => cli_err.exit(),
            None => Err(err),
        },
    }
}
