use std::path::Path;

use crate::commands::common::{normalize_note_identifier, open_service, resolve_note};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let service = open_service(db_path).await?;
    let note = resolve_note(&normalized_id, &service).await?;

    let removed = service.remove_note(&note.id).await?;
    println!("{}", removed.id);
    Ok(())
}
