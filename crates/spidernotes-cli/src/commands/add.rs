use std::path::Path;

use crate::commands::common::{open_service, resolve_note_body};
use crate::error::CliError;

pub async fn run_add(body_parts: &[String], url: &str, db_path: &Path) -> Result<(), CliError> {
    let body = resolve_note_body(body_parts)?;

    let service = open_service(db_path).await?;
    let note = service.create_note(&body, url.trim()).await?;

    println!("{}", note.id);
    Ok(())
}
