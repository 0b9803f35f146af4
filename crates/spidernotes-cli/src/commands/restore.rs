use std::path::Path;

use crate::commands::common::{normalize_note_identifier, open_service, resolve_note};
use crate::error::CliError;

pub async fn run_restore(id: &str, db_path: &Path) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let service = open_service(db_path).await?;
    let note = resolve_note(&normalized_id, &service).await?;

    if !note.is_deleted {
        println!("{} is not deleted", note.id);
        return Ok(());
    }

    let restored = service.undo_remove(&note.id).await?;
    println!("{}", restored.id);
    Ok(())
}
