//! Encryption gate for note payloads and the cached active key.

use std::sync::{Arc, PoisonError, RwLock};

use super::envelope::{decrypt_message, encrypt_message, is_encrypted_message};
use super::{is_encrypted_fields, CryptoError, DerivedKey};
use crate::models::Note;
use crate::Result;

/// Encrypts and decrypts the `body`/`url` pair of a note.
///
/// Holds at most one key; without a key encryption is a no-op and
/// decryption leaves envelopes untouched.
#[derive(Debug, Clone, Default)]
pub struct Encryptor {
    key: Option<DerivedKey>,
}

impl Encryptor {
    /// An encryptor with encryption disabled.
    pub const fn disabled() -> Self {
        Self { key: None }
    }

    pub const fn new(key: DerivedKey) -> Self {
        Self { key: Some(key) }
    }

    /// Build an encryptor for `password`.
    pub fn from_password(password: &str) -> Result<Self> {
        Ok(Self::new(DerivedKey::derive(password)?))
    }

    pub const fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// True if either field of the note is a ciphertext envelope.
    pub fn is_encrypted(note: &Note) -> bool {
        is_encrypted_fields(&note.body, &note.url)
    }

    /// Encrypt the note's fields in place.
    ///
    /// No-op when disabled or when the note is already encrypted.
    pub fn encrypt(&self, note: &mut Note) -> std::result::Result<(), CryptoError> {
        self.encrypt_fields(&mut note.body, &mut note.url)
    }

    /// Encrypt a `body`/`url` pair in place.
    ///
    /// Both fields are replaced together or not at all.
    pub fn encrypt_fields(
        &self,
        body: &mut String,
        url: &mut String,
    ) -> std::result::Result<(), CryptoError> {
        let Some(key) = self.key.as_ref() else {
            return Ok(());
        };
        if is_encrypted_fields(body, url) {
            return Ok(());
        }

        let encrypted_body = encrypt_message(key, body)?;
        let encrypted_url = encrypt_message(key, url)?;
        *body = encrypted_body;
        *url = encrypted_url;
        Ok(())
    }

    /// Decrypt the note's fields in place.
    ///
    /// Each field is attempted independently; a field that cannot be
    /// opened with the active key is left as ciphertext.
    pub fn decrypt(&self, note: &mut Note) {
        if !Self::is_encrypted(note) {
            return;
        }
        let recovered_body = self.decrypt_field(&mut note.body);
        let recovered_url = self.decrypt_field(&mut note.url);
        if !(recovered_body && recovered_url) {
            tracing::debug!("Note {} left undecryptable", note.id);
        }
    }

    /// Decrypt a `body`/`url` pair in place; see [`Encryptor::decrypt`].
    pub fn decrypt_fields(&self, body: &mut String, url: &mut String) {
        if is_encrypted_fields(body, url) {
            self.decrypt_field(body);
            self.decrypt_field(url);
        }
    }

    /// Returns false if the field is still ciphertext afterwards.
    fn decrypt_field(&self, field: &mut String) -> bool {
        if !is_encrypted_message(field) {
            return true;
        }
        let Some(key) = self.key.as_ref() else {
            return false;
        };
        match decrypt_message(key, field) {
            Ok(plaintext) => {
                *field = plaintext;
                true
            }
            Err(error) => {
                tracing::trace!("Field decryption failed: {error}");
                false
            }
        }
    }
}

/// Persistence for the derived key.
#[allow(async_fn_in_trait)]
pub trait KeyStore {
    /// Load the stored key; empty or missing means encryption is disabled.
    async fn load_encryption_key(&self) -> Result<Option<String>>;

    /// Store the key, or clear it with `None`.
    async fn store_encryption_key(&self, key: Option<&str>) -> Result<()>;
}

/// Process-wide cache of the active key.
///
/// Storage is read once by [`KeyState::load`]; afterwards the cache is the
/// source of truth and `enable`/`disable` update both at once. Clones share
/// the same cache.
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    inner: Arc<RwLock<Encryptor>>,
}

impl KeyState {
    /// A key state with encryption disabled and nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the persisted key into a fresh cache.
    pub async fn load<S: KeyStore>(store: &S) -> Result<Self> {
        let stored = store.load_encryption_key().await?;
        let encryptor = stored
            .as_deref()
            .and_then(DerivedKey::from_stored)
            .map_or_else(Encryptor::disabled, Encryptor::new);
        Ok(Self {
            inner: Arc::new(RwLock::new(encryptor)),
        })
    }

    /// Snapshot of the current encryptor.
    pub fn encryptor(&self) -> Encryptor {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_enabled()
    }

    /// Derive and persist a key for `password`, then make it active.
    pub async fn enable<S: KeyStore>(&self, store: &S, password: &str) -> Result<()> {
        let key = DerivedKey::derive(password)?;
        store.store_encryption_key(Some(key.as_str())).await?;
        self.replace(Encryptor::new(key));
        tracing::info!("Encryption enabled");
        Ok(())
    }

    /// Clear the persisted and cached key.
    pub async fn disable<S: KeyStore>(&self, store: &S) -> Result<()> {
        store.store_encryption_key(None).await?;
        self.replace(Encryptor::disabled());
        tracing::info!("Encryption disabled");
        Ok(())
    }

    fn replace(&self, encryptor: Encryptor) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = encryptor;
    }
}
