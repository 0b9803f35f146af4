//! Synchronization with the remote server.
//!
//! One cycle sends a batch of local notes, receives the notes changed on the
//! server since the stored cursor, then purges synced tombstones, advances
//! the cursor, reconciles the `firstModified` watermark and merges the
//! incoming notes. A failed exchange leaves every piece of local state as
//! it was, so the next attempt resumes from the same point.
//!
//! Callers must not run two cycles concurrently.

mod transport;

pub use transport::{
    HttpSyncTransport, SyncRequest, SyncResponse, SyncTransport, TransportError, TransportResult,
};

use crate::crypto::KeyState;
use crate::export::render_json_export;
use crate::merge::{merge_notes, MergeReport, OverwritePolicy};
use crate::models::Note;
use crate::store::{NoteStore, SyncStateStore};
use crate::Result;

/// Minimum time between two periodic syncs (8 hours).
pub const MIN_SYNC_PERIOD_MS: i64 = 28_800_000;

/// Result of one synchronization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was sent: sync is disabled or not due yet.
    Skipped,
    Completed {
        /// Number of notes sent to the server
        sent: usize,
        /// Tombstones purged after the exchange
        purged: usize,
        /// What merging the server's notes changed locally
        merge: MergeReport,
        /// New server cursor
        last_synchronized: i64,
    },
}

/// Drives sync cycles against a local store and a transport.
pub struct Synchronizer<S, T> {
    store: S,
    transport: T,
    keys: KeyState,
}

impl<S, T> Synchronizer<S, T>
where
    S: NoteStore + SyncStateStore,
    T: SyncTransport,
{
    pub const fn new(store: S, transport: T, keys: KeyState) -> Self {
        Self {
            store,
            transport,
            keys,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn enable(&self) -> Result<()> {
        self.store.set_sync_enabled(true).await?;
        tracing::info!("Synchronization enabled");
        Ok(())
    }

    pub async fn disable(&self) -> Result<()> {
        self.store.set_sync_enabled(false).await?;
        tracing::info!("Synchronization disabled");
        Ok(())
    }

    pub async fn is_enabled(&self) -> Result<bool> {
        self.store.sync_enabled().await
    }

    /// Send every local note and pull everything the server has.
    pub async fn sync_all(&self) -> Result<SyncOutcome> {
        let first_modified = self.store.first_modified().await?;
        let outgoing = self.store.fetch_all().await?;
        self.run_cycle(outgoing, first_modified, 0).await
    }

    /// Send the notes modified since `firstModified` and pull changes since
    /// the stored cursor.
    pub async fn sync_modified(&self) -> Result<SyncOutcome> {
        let first_modified = self.store.first_modified().await?;
        let last_synchronized = self.store.last_synchronized().await?;

        let outgoing = if first_modified == 0 {
            Vec::new()
        } else {
            self.store.fetch_modified_since(first_modified).await?
        };
        self.run_cycle(outgoing, first_modified, last_synchronized)
            .await
    }

    /// Run [`Synchronizer::sync_modified`] if enabled and the last sync is
    /// more than [`MIN_SYNC_PERIOD_MS`] older than `now_ms`.
    ///
    /// Installations that never synced are left alone; their first sync is
    /// an explicit [`Synchronizer::sync_all`].
    pub async fn sync_periodically(&self, now_ms: i64) -> Result<SyncOutcome> {
        if !self.is_enabled().await? {
            return Ok(SyncOutcome::Skipped);
        }

        let last_synchronized = self.store.last_synchronized().await?;
        if last_synchronized == 0 || now_ms - last_synchronized <= MIN_SYNC_PERIOD_MS {
            tracing::debug!("Periodic sync not due (last synchronized {last_synchronized})");
            return Ok(SyncOutcome::Skipped);
        }
        self.sync_modified().await
    }

    /// Restore a backup: overwrite local notes with `notes`, then sync all.
    ///
    /// The merge is kept even if the following sync fails.
    pub async fn import_notes(&self, notes: Vec<Note>) -> Result<(MergeReport, SyncOutcome)> {
        let encryptor = self.keys.encryptor();
        let merge = merge_notes(
            &self.store,
            &encryptor,
            notes,
            OverwritePolicy::AlwaysOverwrite,
        )
        .await?;
        tracing::info!(
            "Imported {} notes ({} new)",
            merge.total(),
            merge.created
        );

        let outcome = self.sync_all().await?;
        Ok((merge, outcome))
    }

    /// JSON backup of the readable notes.
    pub async fn export_notes(&self) -> Result<String> {
        let notes = self.store.fetch_all().await?;
        Ok(render_json_export(&notes)?)
    }

    async fn run_cycle(
        &self,
        outgoing: Vec<Note>,
        first_modified: i64,
        last_synchronized: i64,
    ) -> Result<SyncOutcome> {
        if !self.is_enabled().await? {
            tracing::debug!("Synchronization disabled; skipping cycle");
            return Ok(SyncOutcome::Skipped);
        }

        let encryptor = self.keys.encryptor();
        let mut notes = outgoing;
        for note in &mut notes {
            encryptor.encrypt(note)?;
        }
        let request = SyncRequest {
            last_synchronized,
            notes,
        };
        let sent = request.notes.len();

        let response = match self.transport.exchange(&request).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!("Sync exchange failed; local state unchanged: {error}");
                return Err(error.into());
            }
        };

        let purged = self.store.destroy_deleted_before(first_modified).await?;
        self.store
            .set_last_synchronized(response.last_synchronized)
            .await?;
        self.store.reset_first_modified(first_modified).await?;
        let merge = merge_notes(
            &self.store,
            &encryptor,
            response.notes,
            OverwritePolicy::NewerWins,
        )
        .await?;

        tracing::info!(
            "Synchronized: sent {sent}, received {}, purged {purged}",
            merge.total()
        );
        Ok(SyncOutcome::Completed {
            sent,
            purged,
            merge,
            last_synchronized: response.last_synchronized,
        })
    }
}
