//! Error types for spidernotes-core

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::sync::TransportError;

/// Result type alias using spidernotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in spidernotes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A user-authored note failed validation before persistence
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Encryption was enabled with an empty password
    #[error("Invalid credential: encryption password must not be empty")]
    InvalidCredential,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Envelope or cipher failure outside the per-field decrypt path
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Remote exchange failed; no local state was changed
    #[error("Sync transport error: {0}")]
    Transport(#[from] TransportError),
}
