use std::path::Path;

use spidernotes_core::export::render_json_export;
use spidernotes_core::store::NoteStore;

use crate::commands::common::open_service;
use crate::error::CliError;

pub async fn run_export(output_path: Option<&Path>, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let notes = service.fetch_all().await?;
    let rendered = render_json_export(&notes)?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
