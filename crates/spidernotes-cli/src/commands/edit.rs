use std::path::Path;

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_note_identifier, open_service, resolve_note,
};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    body: Option<&str>,
    url: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let service = open_service(db_path).await?;
    let note = resolve_note(&normalized_id, &service).await?;

    let edited_body;
    let body = if body.is_none() && url.is_none() {
        edited_body = capture_editor_input_with_initial(&note.body)?.unwrap_or_default();
        if edited_body == note.body {
            println!("{}", note.id);
            return Ok(());
        }
        Some(edited_body.as_str())
    } else {
        body
    };

    let updated = service.update_note(&note.id, body, url).await?;
    println!("{}", updated.id);
    Ok(())
}
