//! Client-side encryption of note payloads.
//!
//! This module provides:
//! - the derived key kept for the user's encryption password
//! - the ciphertext envelope stored in place of a field
//! - the [`Encryptor`] gate applied to note `body`/`url` pairs
//! - the shared [`KeyState`] cache mirrored to persistent storage

mod encryptor;
mod envelope;

pub use encryptor::{Encryptor, KeyState, KeyStore};
pub use envelope::{decrypt_message, encrypt_message, is_encrypted_message, CipherEnvelope};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Unsupported cipher: {0}")]
    UnsupportedCipher(String),

    #[error("Authentication failed - wrong key or tampered data")]
    AuthenticationFailed,

    #[error("Envelope serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable hash of the user's encryption password.
///
/// This is what gets persisted; the password itself is never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey(String);

impl DerivedKey {
    /// Derive the key for `password`.
    ///
    /// An empty password is rejected with [`crate::Error::InvalidCredential`].
    pub fn derive(password: &str) -> crate::Result<Self> {
        if password.is_empty() {
            return Err(crate::Error::InvalidCredential);
        }
        Ok(Self(hex::encode(Sha256::digest(password.as_bytes()))))
    }

    /// Wrap a key previously loaded from storage; empty means "no key".
    pub fn from_stored(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("DerivedKey([REDACTED])")
    }
}

/// True if either field is a ciphertext envelope.
pub fn is_encrypted_fields(body: &str, url: &str) -> bool {
    is_encrypted_message(body) || is_encrypted_message(url)
}
