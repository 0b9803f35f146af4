use std::path::Path;

use serde::Serialize;
use spidernotes_core::config::ServerConfig;
use spidernotes_core::services::NoteService;
use spidernotes_core::store::SyncStateStore;
use spidernotes_core::sync::SyncOutcome;
use spidernotes_core::util::now_ms;

use crate::cli::SyncCommands;
use crate::commands::common::{format_sync_timestamp, open_service, open_synchronizer};
use crate::config_file::CliConfig;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncStatusItem {
    pub enabled: bool,
    pub server_url: String,
    pub has_token: bool,
    pub encrypted: bool,
    pub last_synchronized: i64,
    pub last_synchronized_iso: String,
    pub first_modified: i64,
}

pub async fn run_sync_command(
    command: Option<SyncCommands>,
    all: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    match command {
        None => run_sync(all, db_path).await,
        Some(SyncCommands::Enable) => run_sync_enable(db_path).await,
        Some(SyncCommands::Disable) => run_sync_disable(db_path).await,
        Some(SyncCommands::Status { json }) => run_sync_status(json, db_path).await,
        Some(SyncCommands::Periodic) => run_sync_periodic(db_path).await,
    }
}

pub async fn run_sync(all: bool, db_path: &Path) -> Result<(), CliError> {
    let synchronizer = open_synchronizer(db_path).await?;
    if !synchronizer.is_enabled().await? {
        println!("Synchronization is disabled. Run `spidernotes sync enable` first.");
        return Ok(());
    }

    let outcome = if all {
        synchronizer.sync_all().await?
    } else {
        synchronizer.sync_modified().await?
    };
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_sync_enable(db_path: &Path) -> Result<(), CliError> {
    let synchronizer = open_synchronizer(db_path).await?;
    synchronizer.enable().await?;

    let outcome = synchronizer.sync_all().await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_sync_disable(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    service.set_sync_enabled(false).await?;
    println!("Synchronization disabled");
    Ok(())
}

pub async fn run_sync_periodic(db_path: &Path) -> Result<(), CliError> {
    let synchronizer = open_synchronizer(db_path).await?;
    let outcome = synchronizer.sync_periodically(now_ms()).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_sync_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let server = CliConfig::load()?.server_config()?;
    let status = sync_status(&service, &server).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "Synchronization: {}",
        if status.enabled { "enabled" } else { "disabled" }
    );
    println!("Server:          {}", status.server_url);
    println!(
        "Token:           {}",
        if status.has_token { "configured" } else { "missing" }
    );
    println!(
        "Encryption:      {}",
        if status.encrypted { "enabled" } else { "disabled" }
    );
    println!("Last synced:     {}", status.last_synchronized_iso);
    if status.first_modified != 0 {
        println!(
            "Pending since:   {}",
            format_sync_timestamp(status.first_modified)
        );
    }
    Ok(())
}

pub async fn sync_status(
    service: &NoteService,
    server: &ServerConfig,
) -> Result<SyncStatusItem, CliError> {
    let last_synchronized = service.last_synchronized().await?;
    Ok(SyncStatusItem {
        enabled: service.sync_enabled().await?,
        server_url: server.base_url.clone(),
        has_token: server.has_token(),
        encrypted: service.keys().is_enabled(),
        last_synchronized,
        last_synchronized_iso: format_sync_timestamp(last_synchronized),
        first_modified: service.first_modified().await?,
    })
}

pub fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Skipped => println!("Sync skipped"),
        SyncOutcome::Completed {
            sent,
            purged,
            merge,
            last_synchronized,
        } => {
            println!(
                "Sync completed: sent {sent}, received {}, updated {}, purged {purged} (cursor {})",
                merge.total(),
                merge.changed(),
                format_sync_timestamp(*last_synchronized)
            );
        }
    }
}
