//! Note model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::crypto;
use crate::error::{Error, Result};
use crate::search::split_unique_words;

/// Opaque note identifier.
///
/// Ids created locally are UUID v7 strings; ids assigned by the server or
/// carried in an imported backup are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("note id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A note attached to one or more web pages or tags.
///
/// The serialized form is the record exchanged with the sync server and
/// written to backups, so field names follow that contract (`isDeleted`).
/// Deserialization is permissive: missing or `null` fields fall back to
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Note {
    /// Unique identifier
    #[serde(deserialize_with = "null_as_default")]
    pub id: NoteId,
    /// Free text content, possibly a ciphertext envelope
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    /// Whitespace/comma separated URLs and tags, possibly a ciphertext envelope
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    /// Creation timestamp (Unix ms)
    #[serde(deserialize_with = "null_as_default")]
    pub created: i64,
    /// Last modification timestamp (Unix ms)
    #[serde(deserialize_with = "null_as_default")]
    pub modified: i64,
    /// Tombstone flag; the row is kept until purged after a sync
    #[serde(deserialize_with = "null_as_default")]
    pub is_deleted: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: NoteId::new(),
            body: String::new(),
            url: String::new(),
            created: 0,
            modified: 0,
            is_deleted: false,
        }
    }
}

impl Note {
    /// Create a new note with the given body and url/tag list
    #[must_use]
    pub fn new(body: impl Into<String>, url: impl Into<String>) -> Self {
        let now = crate::util::now_ms();
        Self {
            id: NoteId::new(),
            body: body.into(),
            url: url.into(),
            created: now,
            modified: now,
            is_deleted: false,
        }
    }

    /// Reject notes whose body and url are both empty.
    ///
    /// Only user-authored notes are validated; merged remote notes are not.
    pub fn validate(&self) -> Result<()> {
        if self.body.is_empty() && self.url.is_empty() {
            return Err(Error::Validation(
                "Both the \"Body\" and \"Web-addresses and/or tags\" fields cannot be blank."
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// True if the note is not deleted and not stuck as ciphertext.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        !self.is_deleted && !self.is_undecryptable()
    }

    /// True if either field is still a ciphertext envelope.
    ///
    /// Notes are decrypted on read, so any envelope left at that point
    /// could not be recovered with the active key.
    #[must_use]
    pub fn is_undecryptable(&self) -> bool {
        crypto::is_encrypted_fields(&self.body, &self.url)
    }

    /// True if every whitespace separated word of `query` occurs in the body
    /// or the url, case-insensitively.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let body = self.body.to_lowercase();
        let url = self.url.to_lowercase();
        query
            .to_lowercase()
            .split_whitespace()
            .all(|word| body.contains(word) || url.contains(word))
    }

    /// Unique words of the url field, in order of first appearance.
    #[must_use]
    pub fn words(&self) -> Vec<String> {
        split_unique_words(&self.url)
    }

    /// Words of the url field that are tags rather than web addresses.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.words()
            .into_iter()
            .filter(|word| !word.contains("://") && !word.contains('.') && !word.contains('/'))
            .collect()
    }

    /// Advance `modified` so it strictly increases on every mutation.
    pub fn touch(&mut self, now: i64) {
        self.modified = now.max(self.modified.saturating_add(1));
        if self.created == 0 {
            self.created = self.modified;
        }
    }

    /// Tombstone the note.
    pub fn mark_deleted(&mut self, now: i64) {
        self.is_deleted = true;
        self.touch(now);
    }

    /// Clear the tombstone flag.
    pub fn restore(&mut self, now: i64) {
        self.is_deleted = false;
        self.touch(now);
    }

    /// Get first line of the body as a preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.body
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}
