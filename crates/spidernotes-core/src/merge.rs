//! Reconciling incoming notes into the local store.
//!
//! Conflicts are resolved per note by `modified` timestamp. Exact ties go
//! to the incoming note so that replicas applying the same batch converge.

use crate::crypto::Encryptor;
use crate::events::{NoteEvent, WriteMode};
use crate::models::Note;
use crate::store::NoteStore;
use crate::Result;

/// How an incoming note replaces an existing local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Restoring a backup: the incoming note always replaces the local one.
    AlwaysOverwrite,
    /// Regular sync: replace iff `incoming.modified >= local.modified`.
    NewerWins,
}

/// Decide whether `incoming` replaces `local`.
pub const fn should_overwrite(policy: OverwritePolicy, local: &Note, incoming: &Note) -> bool {
    match policy {
        OverwritePolicy::AlwaysOverwrite => true,
        OverwritePolicy::NewerWins => incoming.modified >= local.modified,
    }
}

/// Counts of what a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub created: usize,
    pub overwritten: usize,
    pub skipped: usize,
}

impl MergeReport {
    /// Number of incoming notes that were processed.
    pub const fn total(&self) -> usize {
        self.created + self.overwritten + self.skipped
    }

    /// Number of local notes that changed.
    pub const fn changed(&self) -> usize {
        self.created + self.overwritten
    }
}

/// Merge `incoming` into `store`.
///
/// Each note is first run through `encryptor` decrypt so timestamps are
/// compared on the same footing as local reads; the store encrypts again on
/// write. Writes are silent and a single [`NoteEvent::Reset`] is published
/// afterwards when `incoming` is non-empty. Remote notes are not validated.
pub async fn merge_notes<S: NoteStore>(
    store: &S,
    encryptor: &Encryptor,
    incoming: Vec<Note>,
    policy: OverwritePolicy,
) -> Result<MergeReport> {
    let mut report = MergeReport::default();
    if incoming.is_empty() {
        return Ok(report);
    }

    for mut note in incoming {
        encryptor.decrypt(&mut note);

        match store.get(&note.id).await? {
            None => {
                store.create(&note, WriteMode::Silent).await?;
                report.created += 1;
            }
            Some(local) if should_overwrite(policy, &local, &note) => {
                store.save(&note, WriteMode::Silent).await?;
                report.overwritten += 1;
            }
            Some(local) => {
                tracing::debug!(
                    "Kept local note {} (local modified {}, incoming {})",
                    local.id,
                    local.modified,
                    note.modified
                );
                report.skipped += 1;
            }
        }
    }

    store.notify(NoteEvent::Reset);
    tracing::debug!(
        "Merged {} notes: {} created, {} overwritten, {} skipped",
        report.total(),
        report.created,
        report.overwritten,
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::NoteService;
    use pretty_assertions::assert_eq;

    fn note(id: &str, body: &str, modified: i64) -> Note {
        Note {
            id: id.into(),
            body: body.to_string(),
            url: String::new(),
            created: modified,
            modified,
            is_deleted: false,
        }
    }

    async fn store_with(notes: &[Note]) -> NoteService {
        let service = NoteService::open_in_memory().await.unwrap();
        for note in notes {
            service.create(note, WriteMode::Silent).await.unwrap();
        }
        service
    }

    async fn sorted_notes(store: &NoteService) -> Vec<Note> {
        let mut notes = store.fetch_all().await.unwrap();
        notes.sort_by(|a, b| a.id.cmp(&b.id));
        notes
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn newer_wins_keeps_newer_local_note() {
        let store = store_with(&[note("a", "local", 200)]).await;

        let report = merge_notes(
            &store,
            &Encryptor::disabled(),
            vec![note("a", "remote", 150)],
            OverwritePolicy::NewerWins,
        )
        .await
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(store.require(&"a".into()).await.unwrap().body, "local");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn always_overwrite_replaces_newer_local_note() {
        let store = store_with(&[note("a", "local", 200)]).await;

        let report = merge_notes(
            &store,
            &Encryptor::disabled(),
            vec![note("a", "remote", 150)],
            OverwritePolicy::AlwaysOverwrite,
        )
        .await
        .unwrap();

        assert_eq!(report.overwritten, 1);
        assert_eq!(
            store.require(&"a".into()).await.unwrap(),
            note("a", "remote", 150)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_notes_are_created_without_validation() {
        let store = store_with(&[]).await;
        let mut tombstone = note("gone", "", 10);
        tombstone.is_deleted = true;

        let report = merge_notes(
            &store,
            &Encryptor::disabled(),
            vec![tombstone.clone()],
            OverwritePolicy::NewerWins,
        )
        .await
        .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(store.require(&"gone".into()).await.unwrap(), tombstone);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ties_converge_to_incoming_version_in_either_order() {
        let left = note("a", "left", 100);
        let right = note("a", "right", 100);

        let replica_one = store_with(&[left.clone()]).await;
        merge_notes(
            &replica_one,
            &Encryptor::disabled(),
            vec![right.clone()],
            OverwritePolicy::NewerWins,
        )
        .await
        .unwrap();

        let replica_two = store_with(&[]).await;
        for batch in [vec![left], vec![right.clone()]] {
            merge_notes(
                &replica_two,
                &Encryptor::disabled(),
                batch,
                OverwritePolicy::NewerWins,
            )
            .await
            .unwrap();
        }

        assert_eq!(sorted_notes(&replica_one).await, vec![right.clone()]);
        assert_eq!(sorted_notes(&replica_two).await, vec![right]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn merging_same_batch_twice_is_idempotent() {
        let store = store_with(&[note("a", "local", 200), note("b", "local", 100)]).await;
        let batch = vec![
            note("a", "remote", 150),
            note("b", "remote", 300),
            note("c", "remote", 50),
        ];

        merge_notes(
            &store,
            &Encryptor::disabled(),
            batch.clone(),
            OverwritePolicy::NewerWins,
        )
        .await
        .unwrap();
        let once = sorted_notes(&store).await;

        merge_notes(&store, &Encryptor::disabled(), batch, OverwritePolicy::NewerWins)
            .await
            .unwrap();
        assert_eq!(sorted_notes(&store).await, once);
        assert_eq!(
            once.iter().map(|n| n.body.as_str()).collect::<Vec<_>>(),
            vec!["local", "remote", "remote"]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reset_fires_once_and_only_for_non_empty_batches() {
        let store = store_with(&[]).await;
        let mut events = store.subscribe();

        merge_notes(
            &store,
            &Encryptor::disabled(),
            Vec::new(),
            OverwritePolicy::NewerWins,
        )
        .await
        .unwrap();
        assert!(events.try_recv().is_err());

        merge_notes(
            &store,
            &Encryptor::disabled(),
            vec![note("a", "x", 1), note("b", "y", 2)],
            OverwritePolicy::NewerWins,
        )
        .await
        .unwrap();
        assert_eq!(events.try_recv().unwrap(), NoteEvent::Reset);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn encrypted_incoming_notes_are_decrypted_before_storing() {
        let store = store_with(&[]).await;
        let encryptor = Encryptor::from_password("pw").unwrap();
        let mut incoming = note("a", "secret", 10);
        encryptor.encrypt(&mut incoming).unwrap();

        merge_notes(&store, &encryptor, vec![incoming], OverwritePolicy::NewerWins)
            .await
            .unwrap();

        assert_eq!(store.require(&"a".into()).await.unwrap().body, "secret");
    }

    #[test]
    fn should_overwrite_favours_incoming_on_ties() {
        let local = note("a", "local", 100);
        assert!(should_overwrite(
            OverwritePolicy::NewerWins,
            &local,
            &note("a", "remote", 100)
        ));
        assert!(!should_overwrite(
            OverwritePolicy::NewerWins,
            &local,
            &note("a", "remote", 99)
        ));
        assert!(should_overwrite(
            OverwritePolicy::AlwaysOverwrite,
            &local,
            &note("a", "remote", 1)
        ));
    }
}
