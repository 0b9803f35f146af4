//! Ciphertext envelope stored in place of a note field.
//!
//! A field is encrypted with AES-256-GCM under a per-message key derived
//! with HKDF-SHA256 from the active key and a random salt. The result is
//! serialized as a JSON object:
//!
//! ```text
//! {"iv": b64, "salt": b64, "cipher": "aes", "mode": "gcm", "ks": 256, "ct": b64}
//! ```

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{CryptoError, DerivedKey};

/// Cipher identifier recognized by [`is_encrypted_message`].
pub const CIPHER_NAME: &str = "aes";
const CIPHER_MODE: &str = "gcm";
const KEY_SIZE_BITS: u32 = 256;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const HKDF_INFO: &[u8] = b"spidernotes note field v1";

/// Structured ciphertext for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherEnvelope {
    pub iv: String,
    pub salt: String,
    pub cipher: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_key_size")]
    pub ks: u32,
    pub ct: String,
}

fn default_mode() -> String {
    CIPHER_MODE.to_string()
}

const fn default_key_size() -> u32 {
    KEY_SIZE_BITS
}

/// Return true if `message` is shaped like a ciphertext envelope.
///
/// The check is structural: a JSON object with non-empty `iv` and `salt`
/// and `cipher == "aes"`. Whether the active key can open it is irrelevant.
pub fn is_encrypted_message(message: &str) -> bool {
    if message.is_empty() {
        return false;
    }
    let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(message) else {
        return false;
    };

    fields.get("iv").is_some_and(is_truthy)
        && fields.get("salt").is_some_and(is_truthy)
        && fields.get("cipher").and_then(serde_json::Value::as_str) == Some(CIPHER_NAME)
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(text) => !text.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Encrypt `plaintext` and return the serialized envelope.
pub fn encrypt_message(key: &DerivedKey, plaintext: &str) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let message_key = derive_message_key(key, &salt)?;
    let cipher = Aes256Gcm::new((&message_key).into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|error| CryptoError::EncryptionFailed(error.to_string()))?;

    let envelope = CipherEnvelope {
        iv: BASE64_STANDARD.encode(nonce),
        salt: BASE64_STANDARD.encode(salt),
        cipher: CIPHER_NAME.to_string(),
        mode: CIPHER_MODE.to_string(),
        ks: KEY_SIZE_BITS,
        ct: BASE64_STANDARD.encode(ciphertext),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decrypt a serialized envelope.
///
/// Fails on malformed envelopes, unsupported ciphers and wrong keys.
pub fn decrypt_message(key: &DerivedKey, message: &str) -> Result<String, CryptoError> {
    let envelope: CipherEnvelope = serde_json::from_str(message)?;
    if envelope.cipher != CIPHER_NAME || envelope.mode != CIPHER_MODE {
        return Err(CryptoError::UnsupportedCipher(format!(
            "{}-{}",
            envelope.cipher, envelope.mode
        )));
    }

    let iv = decode_field("iv", &envelope.iv)?;
    if iv.len() != NONCE_LEN {
        return Err(CryptoError::MalformedEnvelope(format!(
            "iv must be {NONCE_LEN} bytes, got {}",
            iv.len()
        )));
    }
    let salt = decode_field("salt", &envelope.salt)?;
    let ciphertext = decode_field("ct", &envelope.ct)?;

    let message_key = derive_message_key(key, &salt)?;
    let cipher = Aes256Gcm::new((&message_key).into());
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::MalformedEnvelope("invalid UTF-8".into()))
}

fn derive_message_key(key: &DerivedKey, salt: &[u8]) -> Result<[u8; 32], CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), key.as_str().as_bytes());
    let mut okm = [0u8; 32];
    hkdf.expand(HKDF_INFO, &mut okm)
        .map_err(|error| CryptoError::KeyDerivation(error.to_string()))?;
    Ok(okm)
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64_STANDARD
        .decode(value)
        .map_err(|error| CryptoError::MalformedEnvelope(format!("{name}: {error}")))
}
