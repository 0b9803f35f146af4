//! Collaborator traits consumed by the merge engine and the synchronizer.

use crate::events::{NoteEvent, WriteMode};
use crate::models::{Note, NoteId};
use crate::Result;

/// Local note store.
///
/// Reads return notes decrypted with the active key; writes take plaintext
/// and persist it encrypted when encryption is enabled.
#[allow(async_fn_in_trait)]
pub trait NoteStore {
    async fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// Insert a note that does not exist yet.
    async fn create(&self, note: &Note, mode: WriteMode) -> Result<()>;

    /// Insert or replace a note.
    async fn save(&self, note: &Note, mode: WriteMode) -> Result<()>;

    /// Physically remove a note. Returns false if it did not exist.
    async fn destroy(&self, id: &NoteId, mode: WriteMode) -> Result<bool>;

    /// Every note, tombstones included.
    async fn fetch_all(&self) -> Result<Vec<Note>>;

    /// Notes with `modified >= since`.
    async fn fetch_modified_since(&self, since: i64) -> Result<Vec<Note>>;

    /// Physically remove tombstones with `modified <= before`.
    ///
    /// Returns the number of notes removed.
    async fn destroy_deleted_before(&self, before: i64) -> Result<usize>;

    /// Publish a store-level notification.
    fn notify(&self, event: NoteEvent);
}

/// Persisted sync watermarks and the sync toggle.
#[allow(async_fn_in_trait)]
pub trait SyncStateStore {
    async fn first_modified(&self) -> Result<i64>;

    /// Guarded assignment; see [`crate::db::StateRepository::propose_first_modified`].
    async fn propose_first_modified(&self, candidate: i64) -> Result<i64>;

    /// Reset to 0 iff the stored value still equals `expected`.
    async fn reset_first_modified(&self, expected: i64) -> Result<bool>;

    async fn last_synchronized(&self) -> Result<i64>;

    async fn set_last_synchronized(&self, value: i64) -> Result<()>;

    async fn sync_enabled(&self) -> Result<bool>;

    async fn set_sync_enabled(&self, enabled: bool) -> Result<()>;
}
