//! spidernotes - command-line client for Spider Notes
//!
//! Usage:
//!   spidernotes "Quick thought"           # Quick capture
//!   spidernotes add "Note" --url site.com # Attach to a page
//!   spidernotes list                      # List recent notes
//!   spidernotes sync                      # Sync pending changes

mod cli;
mod commands;
mod config_file;
mod error;

#[cfg(test)]
mod tests;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::account::run_account;
use crate::commands::add::run_add;
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::encryption::run_encryption;
use crate::commands::export::run_export;
use crate::commands::import::run_import;
use crate::commands::list::run_list;
use crate::commands::restore::run_restore;
use crate::commands::search::run_search;
use crate::commands::sync::run_sync_command;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "spidernotes=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell, output }) => run_completions(shell, output.as_deref()),
        Some(Commands::Config { command }) => run_config(command),
        Some(command) => {
            let db_path = resolve_db_path(cli.db_path)?;
            dispatch(command, &db_path).await
        }
        None => {
            // Quick capture mode: spidernotes "my thought"
            if cli.note.is_empty() {
                Cli::command().print_help()?;
                println!();
                Ok(())
            } else {
                let db_path = resolve_db_path(cli.db_path)?;
                run_add(&cli.note, "", &db_path).await
            }
        }
    }
}

async fn dispatch(command: Commands, db_path: &std::path::Path) -> Result<(), CliError> {
    match command {
        Commands::Add { body, url } => run_add(&body, &url, db_path).await,
        Commands::List {
            limit,
            json,
            deleted,
        } => run_list(limit, json, deleted, db_path).await,
        Commands::Search { query, limit, json } => run_search(&query, limit, json, db_path).await,
        Commands::Edit { id, body, url } => {
            run_edit(&id, body.as_deref(), url.as_deref(), db_path).await
        }
        Commands::Delete { id } => run_delete(&id, db_path).await,
        Commands::Restore { id } => run_restore(&id, db_path).await,
        Commands::Export { output } => run_export(output.as_deref(), db_path).await,
        Commands::Import { path } => run_import(&path, db_path).await,
        Commands::Sync { all, command } => run_sync_command(command, all, db_path).await,
        Commands::Encryption { command } => run_encryption(command, db_path).await,
        Commands::Account { command } => run_account(command, db_path).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => run_config(command),
    }
}
