use std::path::Path;

use spidernotes_core::services::NoteService;
use spidernotes_core::store::SyncStateStore;

use crate::cli::EncryptionCommands;
use crate::commands::common::{open_service, synchronizer_for};
use crate::commands::sync::print_outcome;
use crate::error::CliError;

pub async fn run_encryption(command: EncryptionCommands, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    match command {
        EncryptionCommands::Enable { password } => {
            let encrypted = service.enable_encryption(&password).await?;
            println!("Encryption enabled; {encrypted} notes encrypted");
            sync_after_rewrite(&service).await
        }
        EncryptionCommands::Disable => {
            let decrypted = service.disable_encryption().await?;
            println!("Encryption disabled; {decrypted} notes decrypted");
            let remaining = service.undecryptable_notes().await?.len();
            if remaining > 0 {
                println!("{remaining} notes could not be decrypted and remain encrypted");
            }
            sync_after_rewrite(&service).await
        }
        EncryptionCommands::Status => {
            let undecryptable = service.undecryptable_notes().await?.len();
            println!(
                "Encryption: {}",
                if service.keys().is_enabled() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("Undecryptable notes: {undecryptable}");
            Ok(())
        }
        EncryptionCommands::Purge => {
            let removed = service.remove_undecryptable().await?;
            println!("Deleted {removed} undecryptable notes");
            sync_after_rewrite(&service).await
        }
    }
}

/// Push rewritten notes to the server when sync is on and configured.
async fn sync_after_rewrite(service: &NoteService) -> Result<(), CliError> {
    if !service.sync_enabled().await? {
        return Ok(());
    }

    match synchronizer_for(service.clone()) {
        Ok(synchronizer) => {
            let outcome = synchronizer.sync_all().await?;
            print_outcome(&outcome);
            Ok(())
        }
        Err(CliError::SyncNotConfigured) => {
            tracing::warn!("Sync is enabled but no messaging token is configured");
            Ok(())
        }
        Err(error) => Err(error),
    }
}
