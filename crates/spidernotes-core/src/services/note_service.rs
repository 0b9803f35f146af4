//! Shared note service used by every client.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::crypto::{DerivedKey, Encryptor, KeyState, KeyStore};
use crate::db::{
    Database, LibSqlNoteRepository, LibSqlPreferencesRepository, LibSqlStateRepository,
    NoteRepository, PreferencesRepository, StateRepository,
};
use crate::events::{EventBus, NoteEvent, WriteMode};
use crate::models::{Note, NoteId, Preferences};
use crate::store::{NoteStore, SyncStateStore};
use crate::util::now_ms;
use crate::{search, Error, Result};

/// Thread-safe facade over the local database.
///
/// Owns the note store, the sync watermarks, the preferences and the active
/// encryption key. Notes are written encrypted when a key is active and
/// decrypted on every read. Clones share the same database, key cache and
/// event channel.
#[derive(Clone)]
pub struct NoteService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    keys: KeyState,
    events: EventBus,
}

impl NoteService {
    /// Open a note service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        Self::from_database(db, Some(db_path)).await
    }

    /// Open an in-memory note service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Self::from_database(db, None).await
    }

    async fn from_database(db: Database, db_path: Option<PathBuf>) -> Result<Self> {
        let mut service = Self {
            db: Arc::new(Mutex::new(db)),
            db_path,
            keys: KeyState::new(),
            events: EventBus::new(),
        };
        service.keys = KeyState::load(&service).await?;
        Ok(service)
    }

    /// Filesystem path of the database, if not in-memory.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Shared encryption key state.
    pub const fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// Event channel for store notifications.
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.events.subscribe()
    }

    fn seal(&self, note: &Note) -> Result<Note> {
        let mut sealed = note.clone();
        self.keys.encryptor().encrypt(&mut sealed)?;
        Ok(sealed)
    }

    fn open_all(&self, notes: Vec<Note>) -> Vec<Note> {
        let encryptor = self.keys.encryptor();
        notes
            .into_iter()
            .map(|mut note| {
                encryptor.decrypt(&mut note);
                note
            })
            .collect()
    }

    /// Stored rows exactly as persisted.
    async fn raw_notes(&self) -> Result<Vec<Note>> {
        let db = self.db.lock().await;
        let repo = LibSqlNoteRepository::new(db.connection());
        repo.list_all().await
    }

    async fn write_raw(&self, note: &Note) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlNoteRepository::new(db.connection());
        repo.upsert(note).await
    }

    /// Fetch a note by id or fail with [`Error::NotFound`].
    pub async fn require(&self, id: &NoteId) -> Result<Note> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Create a user-authored note.
    pub async fn create_note(&self, body: &str, url: &str) -> Result<Note> {
        let note = Note::new(body, url);
        note.validate()?;

        self.create(&note, WriteMode::Notify).await?;
        self.propose_first_modified(note.modified).await?;
        Ok(note)
    }

    /// Replace the body and/or url of a note.
    pub async fn update_note(
        &self,
        id: &NoteId,
        body: Option<&str>,
        url: Option<&str>,
    ) -> Result<Note> {
        let mut note = self.require(id).await?;
        if note.is_undecryptable() {
            return Err(Error::InvalidInput(format!(
                "Note {id} cannot be decrypted with the current password"
            )));
        }

        if let Some(body) = body {
            note.body = body.to_string();
        }
        if let Some(url) = url {
            note.url = url.to_string();
        }
        note.validate()?;
        note.touch(now_ms());

        self.save(&note, WriteMode::Notify).await?;
        self.propose_first_modified(note.modified).await?;
        Ok(note)
    }

    /// Tombstone a note; it stays in the store until purged after a sync.
    pub async fn remove_note(&self, id: &NoteId) -> Result<Note> {
        let mut note = self.require(id).await?;
        note.mark_deleted(now_ms());

        self.save(&note, WriteMode::Silent).await?;
        self.notify(NoteEvent::Removed(note.id.clone()));
        self.propose_first_modified(note.modified).await?;
        Ok(note)
    }

    /// Clear the tombstone of a removed note.
    pub async fn undo_remove(&self, id: &NoteId) -> Result<Note> {
        let mut note = self.require(id).await?;
        note.restore(now_ms());

        self.save(&note, WriteMode::Notify).await?;
        self.propose_first_modified(note.modified).await?;
        Ok(note)
    }

    /// Readable notes, newest first.
    pub async fn list_readable(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .fetch_all()
            .await?
            .into_iter()
            .filter(Note::is_readable)
            .collect();
        notes.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(notes)
    }

    /// Tombstoned notes that have not been purged yet, newest first.
    pub async fn list_deleted(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|note| note.is_deleted)
            .collect();
        notes.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(notes)
    }

    /// Readable notes matching every word of `query`, newest first.
    pub async fn search(&self, query: &str) -> Result<Vec<Note>> {
        let notes = self.fetch_all().await?;
        Ok(search::filter_notes(&notes, query)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Number of readable notes referencing the hostname of `url`.
    pub async fn count_matches(&self, url: &str) -> Result<usize> {
        let notes = self.fetch_all().await?;
        Ok(search::count_matches(&notes, url))
    }

    /// Live notes that the active key cannot decrypt.
    pub async fn undecryptable_notes(&self) -> Result<Vec<Note>> {
        Ok(self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|note| !note.is_deleted && note.is_undecryptable())
            .collect())
    }

    /// Tombstone every undecryptable note.
    pub async fn remove_undecryptable(&self) -> Result<usize> {
        let notes = self.undecryptable_notes().await?;
        let now = now_ms();

        let mut earliest = 0;
        for mut note in notes.iter().cloned() {
            note.mark_deleted(now);
            self.save(&note, WriteMode::Silent).await?;
            if earliest == 0 || note.modified < earliest {
                earliest = note.modified;
            }
        }

        if earliest != 0 {
            self.propose_first_modified(earliest).await?;
        }
        self.notify(NoteEvent::Reset);
        tracing::info!("Removed {} undecryptable notes", notes.len());
        Ok(notes.len())
    }

    /// Encrypt every stored plaintext note with the active key.
    ///
    /// Timestamps are left untouched. Returns the number of rows rewritten.
    pub async fn encrypt_all(&self) -> Result<usize> {
        let encryptor = self.keys.encryptor();
        self.rewrite_all(|note| {
            if Encryptor::is_encrypted(note) {
                return Ok(false);
            }
            encryptor.encrypt(note)?;
            Ok(Encryptor::is_encrypted(note))
        })
        .await
    }

    /// Decrypt every stored note the active key can open.
    ///
    /// Returns the number of rows rewritten.
    pub async fn decrypt_all(&self) -> Result<usize> {
        let encryptor = self.keys.encryptor();
        self.rewrite_all(|note| {
            if !Encryptor::is_encrypted(note) {
                return Ok(false);
            }
            let before = note.clone();
            encryptor.decrypt(note);
            Ok(*note != before)
        })
        .await
    }

    /// Apply `transform` to every stored row and persist the ones it changed.
    async fn rewrite_all<F>(&self, mut transform: F) -> Result<usize>
    where
        F: FnMut(&mut Note) -> Result<bool>,
    {
        let mut rewritten = 0;
        for mut note in self.raw_notes().await? {
            if transform(&mut note)? {
                self.write_raw(&note).await?;
                rewritten += 1;
            }
        }

        self.notify(NoteEvent::Reset);
        tracing::debug!("Rewrote {rewritten} notes");
        Ok(rewritten)
    }

    /// Activate encryption with `password` and encrypt the stored notes.
    ///
    /// When another key is active, the notes it can open are decrypted first
    /// and then re-encrypted under the new key.
    pub async fn enable_encryption(&self, password: &str) -> Result<usize> {
        DerivedKey::derive(password)?;
        if self.keys.is_enabled() {
            let decrypted = self.decrypt_all().await?;
            tracing::info!("Decrypted {decrypted} notes before switching keys");
        }
        self.keys.enable(self, password).await?;
        self.encrypt_all().await
    }

    /// Decrypt the stored notes, then clear the key.
    ///
    /// Notes the current key cannot open stay encrypted.
    pub async fn disable_encryption(&self) -> Result<usize> {
        let decrypted = self.decrypt_all().await?;
        self.keys.disable(self).await?;
        Ok(decrypted)
    }

    /// Load user preferences.
    pub async fn load_preferences(&self) -> Result<Preferences> {
        let db = self.db.lock().await;
        let repo = LibSqlPreferencesRepository::new(db.connection());
        repo.load().await
    }

    /// Persist user preferences.
    pub async fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlPreferencesRepository::new(db.connection());
        repo.save(preferences).await
    }

    /// Forget every note, watermark, preference and the encryption key.
    pub async fn clear_all_data(&self) -> Result<()> {
        {
            let db = self.db.lock().await;
            LibSqlNoteRepository::new(db.connection()).clear().await?;
            LibSqlStateRepository::new(db.connection()).clear().await?;
            LibSqlPreferencesRepository::new(db.connection())
                .clear()
                .await?;
        }
        self.keys.disable(self).await?;
        self.notify(NoteEvent::Reset);
        tracing::info!("Cleared all local data");
        Ok(())
    }
}

impl NoteStore for NoteService {
    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let stored = {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.get(id).await?
        };
        Ok(stored.map(|mut note| {
            self.keys.encryptor().decrypt(&mut note);
            note
        }))
    }

    async fn create(&self, note: &Note, mode: WriteMode) -> Result<()> {
        let sealed = self.seal(note)?;
        {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.insert(&sealed).await?;
        }
        self.events.publish(mode, NoteEvent::Added(note.id.clone()));
        Ok(())
    }

    async fn save(&self, note: &Note, mode: WriteMode) -> Result<()> {
        let sealed = self.seal(note)?;
        self.write_raw(&sealed).await?;
        self.events
            .publish(mode, NoteEvent::Changed(note.id.clone()));
        Ok(())
    }

    async fn destroy(&self, id: &NoteId, mode: WriteMode) -> Result<bool> {
        let existed = {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.delete(id).await?
        };
        if existed {
            self.events.publish(mode, NoteEvent::Removed(id.clone()));
        }
        Ok(existed)
    }

    async fn fetch_all(&self) -> Result<Vec<Note>> {
        let notes = self.raw_notes().await?;
        Ok(self.open_all(notes))
    }

    async fn fetch_modified_since(&self, since: i64) -> Result<Vec<Note>> {
        let notes = {
            let db = self.db.lock().await;
            let repo = LibSqlNoteRepository::new(db.connection());
            repo.list_modified_since(since).await?
        };
        Ok(self.open_all(notes))
    }

    async fn destroy_deleted_before(&self, before: i64) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let mut destroyed = 0;
        for note in repo.list_deleted_before(before).await? {
            if repo.delete(&note.id).await? {
                destroyed += 1;
            }
        }

        tracing::debug!("Purged {destroyed} tombstones modified at or before {before}");
        Ok(destroyed)
    }

    fn notify(&self, event: NoteEvent) {
        match event {
            NoteEvent::Reset => self.events.publish_reset(),
            event => self.events.publish(WriteMode::Notify, event),
        }
    }
}

impl SyncStateStore for NoteService {
    async fn first_modified(&self) -> Result<i64> {
        let db = self.db.lock().await;
        LibSqlStateRepository::new(db.connection())
            .first_modified()
            .await
    }

    async fn propose_first_modified(&self, candidate: i64) -> Result<i64> {
        let db = self.db.lock().await;
        LibSqlStateRepository::new(db.connection())
            .propose_first_modified(candidate)
            .await
    }

    async fn reset_first_modified(&self, expected: i64) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlStateRepository::new(db.connection())
            .reset_first_modified(expected)
            .await
    }

    async fn last_synchronized(&self) -> Result<i64> {
        let db = self.db.lock().await;
        LibSqlStateRepository::new(db.connection())
            .last_synchronized()
            .await
    }

    async fn set_last_synchronized(&self, value: i64) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlStateRepository::new(db.connection())
            .set_last_synchronized(value)
            .await
    }

    async fn sync_enabled(&self) -> Result<bool> {
        Ok(self.load_preferences().await?.is_synchronization_enabled)
    }

    async fn set_sync_enabled(&self, enabled: bool) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlPreferencesRepository::new(db.connection());
        let mut preferences = repo.load().await?;
        preferences.is_synchronization_enabled = enabled;
        repo.save(&preferences).await
    }
}

impl KeyStore for NoteService {
    async fn load_encryption_key(&self) -> Result<Option<String>> {
        let db = self.db.lock().await;
        LibSqlStateRepository::new(db.connection())
            .encryption_key()
            .await
    }

    async fn store_encryption_key(&self, key: Option<&str>) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlStateRepository::new(db.connection())
            .set_encryption_key(key)
            .await
    }
}
