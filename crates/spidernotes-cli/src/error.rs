use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] spidernotes_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync is not configured. Run `spidernotes config init --token <token>` or set SPIDERNOTES_TOKEN.")]
    SyncNotConfigured,
    #[error("Aborted")]
    Aborted,
}

impl From<spidernotes_core::sync::TransportError> for CliError {
    fn from(error: spidernotes_core::sync::TransportError) -> Self {
        Self::Core(error.into())
    }
}
