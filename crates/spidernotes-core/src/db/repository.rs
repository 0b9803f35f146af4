//! Note repository implementation

use crate::error::Result;
use crate::models::{Note, NoteId};
use libsql::params::IntoParams;
use libsql::{params, Connection, Row};

const NOTE_COLUMNS: &str = "id, body, url, created, modified, is_deleted";

/// Trait for note storage operations (async)
///
/// Rows are stored exactly as given: callers decide whether `body`/`url`
/// hold plaintext or ciphertext envelopes.
#[allow(async_fn_in_trait)]
pub trait NoteRepository {
    /// Get a note by ID
    async fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// Insert a new note; fails if the id already exists
    async fn insert(&self, note: &Note) -> Result<()>;

    /// Insert or replace a note by id
    async fn upsert(&self, note: &Note) -> Result<()>;

    /// Physically remove a note; returns false if it did not exist
    async fn delete(&self, id: &NoteId) -> Result<bool>;

    /// All notes including tombstones, oldest modification first
    async fn list_all(&self) -> Result<Vec<Note>>;

    /// Notes with `modified >= since`, oldest modification first
    async fn list_modified_since(&self, since: i64) -> Result<Vec<Note>>;

    /// Tombstones with `modified <= before`
    async fn list_deleted_before(&self, before: i64) -> Result<Vec<Note>>;

    /// Remove every note
    async fn clear(&self) -> Result<()>;
}

/// libSQL implementation of `NoteRepository`
pub struct LibSqlNoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a note from a database row
    fn parse_note(row: &Row) -> Result<Note> {
        let id: String = row.get(0)?;
        Ok(Note {
            id: NoteId::from(id.as_str()),
            body: row.get(1)?,
            url: row.get(2)?,
            created: row.get(3)?,
            modified: row.get(4)?,
            is_deleted: row.get::<i32>(5)? != 0,
        })
    }

    async fn query_notes(&self, sql: &str, params: impl IntoParams) -> Result<Vec<Note>> {
        let mut rows = self.conn.query(sql, params).await?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(Self::parse_note(&row)?);
        }

        Ok(notes)
    }

    async fn write(&self, verb: &str, note: &Note) -> Result<()> {
        self.conn
            .execute(
                &format!("{verb} INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
                params![
                    note.id.as_str(),
                    note.body.as_str(),
                    note.url.as_str(),
                    note.created,
                    note.modified,
                    i32::from(note.is_deleted),
                ],
            )
            .await?;
        Ok(())
    }
}

impl NoteRepository for LibSqlNoteRepository<'_> {
    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_note(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, note: &Note) -> Result<()> {
        self.write("INSERT", note).await
    }

    async fn upsert(&self, note: &Note) -> Result<()> {
        self.write("INSERT OR REPLACE", note).await
    }

    async fn delete(&self, id: &NoteId) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?", [id.as_str()])
            .await?;
        Ok(affected > 0)
    }

    async fn list_all(&self) -> Result<Vec<Note>> {
        self.query_notes(
            &format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY modified ASC, id ASC"),
            (),
        )
        .await
    }

    async fn list_modified_since(&self, since: i64) -> Result<Vec<Note>> {
        self.query_notes(
            &format!(
                "SELECT {NOTE_COLUMNS} FROM notes WHERE modified >= ? ORDER BY modified ASC, id ASC"
            ),
            [since],
        )
        .await
    }

    async fn list_deleted_before(&self, before: i64) -> Result<Vec<Note>> {
        self.query_notes(
            &format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 WHERE is_deleted = 1 AND modified <= ?
                 ORDER BY modified ASC, id ASC"
            ),
            [before],
        )
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM notes", ()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn note(id: &str, modified: i64, is_deleted: bool) -> Note {
        Note {
            id: id.into(),
            body: format!("body {id}"),
            url: "example.com".to_string(),
            created: modified,
            modified,
            is_deleted,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let original = note("a", 100, false);
        repo.insert(&original).await.unwrap();

        let fetched = repo.get(&"a".into()).await.unwrap().unwrap();
        assert_eq!(fetched, original);
        assert!(repo.get(&"missing".into()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_rejects_duplicate_id() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.insert(&note("a", 100, false)).await.unwrap();
        assert!(repo.insert(&note("a", 200, false)).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_replaces_existing() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.upsert(&note("a", 100, false)).await.unwrap();
        let mut updated = note("a", 200, true);
        updated.body = "changed".to_string();
        repo.upsert(&updated).await.unwrap();

        assert_eq!(repo.list_all().await.unwrap(), vec![updated]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_reports_existence() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.insert(&note("a", 100, false)).await.unwrap();
        assert!(repo.delete(&"a".into()).await.unwrap());
        assert!(!repo.delete(&"a".into()).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_modified_since_is_inclusive() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        for (id, modified) in [("a", 100), ("b", 200), ("c", 300)] {
            repo.insert(&note(id, modified, false)).await.unwrap();
        }

        let ids: Vec<String> = repo
            .list_modified_since(200)
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.id.to_string())
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_deleted_before_only_returns_old_tombstones() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.insert(&note("live", 100, false)).await.unwrap();
        repo.insert(&note("old", 150, true)).await.unwrap();
        repo.insert(&note("edge", 200, true)).await.unwrap();
        repo.insert(&note("new", 250, true)).await.unwrap();

        let ids: Vec<String> = repo
            .list_deleted_before(200)
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.id.to_string())
            .collect();
        assert_eq!(ids, vec!["old".to_string(), "edge".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_removes_everything() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.insert(&note("a", 100, false)).await.unwrap();
        repo.insert(&note("b", 100, true)).await.unwrap();
        repo.clear().await.unwrap();

        assert!(repo.list_all().await.unwrap().is_empty());
    }
}
