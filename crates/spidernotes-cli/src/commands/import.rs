use std::path::Path;

use spidernotes_core::export::parse_import;
use spidernotes_core::merge::{merge_notes, MergeReport, OverwritePolicy};
use spidernotes_core::store::SyncStateStore;
use spidernotes_core::sync::SyncOutcome;

use crate::commands::common::{open_service, synchronizer_for};
use crate::commands::sync::print_outcome;
use crate::error::CliError;

pub async fn run_import(path: &Path, db_path: &Path) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(path)?;
    let notes = parse_import(&raw)?;
    let service = open_service(db_path).await?;

    if service.sync_enabled().await? {
        match synchronizer_for(service.clone()) {
            Ok(synchronizer) => {
                let (report, outcome) = synchronizer.import_notes(notes).await?;
                print_report(&report);
                print_outcome(&outcome);
                return Ok(());
            }
            Err(CliError::SyncNotConfigured) => {
                tracing::warn!("Sync is enabled but no messaging token is configured");
            }
            Err(error) => return Err(error),
        }
    }

    let encryptor = service.keys().encryptor();
    let report = merge_notes(&service, &encryptor, notes, OverwritePolicy::AlwaysOverwrite).await?;
    print_report(&report);
    print_outcome(&SyncOutcome::Skipped);
    Ok(())
}

fn print_report(report: &MergeReport) {
    println!(
        "Imported {} notes ({} new, {} replaced)",
        report.total(),
        report.created,
        report.overwritten
    );
}
