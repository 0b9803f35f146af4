//! Backup export and import in the sync record format.

use crate::error::{Error, Result};
use crate::models::Note;

/// Render the readable notes as a pretty-printed JSON array.
///
/// Tombstones and notes the active key cannot decrypt are left out; a
/// backup is meant to be read by a human.
pub fn render_json_export(notes: &[Note]) -> serde_json::Result<String> {
    let readable: Vec<&Note> = notes.iter().filter(|note| note.is_readable()).collect();
    serde_json::to_string_pretty(&readable)
}

/// Parse a backup file.
///
/// Accepts a JSON array of note records; missing fields fall back to note
/// defaults, so a record without an id gets a fresh one.
pub fn parse_import(json: &str) -> Result<Vec<Note>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.is_array() {
        return Err(Error::InvalidInput(
            "backup must be a JSON array of notes".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(timestamp_ms: i64) -> String {
    format!("spidernotes-export-{timestamp_ms}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Encryptor;
    use pretty_assertions::assert_eq;

    fn readable_note() -> Note {
        Note {
            id: "a".into(),
            body: "hi".to_string(),
            url: String::new(),
            created: 100,
            modified: 100,
            is_deleted: false,
        }
    }

    #[test]
    fn export_includes_readable_notes_verbatim() {
        let rendered = render_json_export(&[readable_note()]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(
            parsed,
            serde_json::json!([{
                "id": "a",
                "body": "hi",
                "url": "",
                "created": 100,
                "modified": 100,
                "isDeleted": false
            }])
        );
    }

    #[test]
    fn export_skips_tombstones_and_undecryptable_notes() {
        let mut deleted = readable_note();
        deleted.id = "deleted".into();
        deleted.is_deleted = true;

        let mut locked = readable_note();
        locked.id = "locked".into();
        Encryptor::from_password("pw")
            .unwrap()
            .encrypt(&mut locked)
            .unwrap();

        let rendered = render_json_export(&[readable_note(), deleted, locked]).unwrap();
        let exported = parse_import(&rendered).unwrap();
        assert_eq!(exported, vec![readable_note()]);
    }

    #[test]
    fn parse_import_fills_missing_fields() {
        let notes = parse_import(r#"[{"id": "x", "body": "only body"}]"#).unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id.as_str(), "x");
        assert_eq!(notes[0].url, "");
        assert_eq!(notes[0].modified, 0);
        assert!(!notes[0].is_deleted);
    }

    #[test]
    fn parse_import_accepts_null_fields() {
        let notes =
            parse_import(r#"[{"id": "a", "body": "hi", "url": null, "created": null, "modified": null, "isDeleted": null}]"#)
                .unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].body, "hi");
        assert_eq!(notes[0].url, "");
        assert_eq!(notes[0].created, 0);
        assert_eq!(notes[0].modified, 0);
        assert!(!notes[0].is_deleted);
    }

    #[test]
    fn parse_import_rejects_non_arrays() {
        assert!(matches!(
            parse_import(r#"{"id": "x"}"#),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            parse_import("not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn suggested_export_file_name_is_deterministic() {
        assert_eq!(
            suggested_export_file_name(123),
            "spidernotes-export-123.json"
        );
    }
}
