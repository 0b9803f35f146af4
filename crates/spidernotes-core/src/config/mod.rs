//! Server configuration shared by client apps.
//!
//! The sync server is addressed by a base URL and authenticated with a
//! per-user messaging token. Both can come from the environment.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Production server.
pub const DEFAULT_SERVER_URL: &str = "https://spider-notes.appspot.com";
/// Environment variable overriding the server base URL.
pub const SERVER_URL_ENV: &str = "SPIDERNOTES_SERVER_URL";
/// Environment variable holding the messaging token.
pub const TOKEN_ENV: &str = "SPIDERNOTES_TOKEN";

const SYNC_PATH: &str = "/api/sync";
const USER_PATH: &str = "/api/user";
const DISCONNECT_PATH: &str = "/api/disconnect";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Normalized base URL without a trailing slash
    pub base_url: String,
    #[serde(default)]
    pub messaging_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            messaging_token: None,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ServerConfig")
            .field("base_url", &self.base_url)
            .field(
                "messaging_token",
                &self.messaging_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ServerConfig {
    /// Build a config, validating and normalizing the base URL.
    pub fn new(base_url: impl Into<String>, messaging_token: Option<String>) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            messaging_token: normalize_text_option(messaging_token),
        })
    }

    /// Resolve from the environment, falling back to the given values and
    /// then to the production server.
    pub fn resolve(base_url: Option<String>, messaging_token: Option<String>) -> Result<Self> {
        let base_url = normalize_text_option(std::env::var(SERVER_URL_ENV).ok())
            .or_else(|| normalize_text_option(base_url))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let messaging_token =
            normalize_text_option(std::env::var(TOKEN_ENV).ok()).or(messaging_token);
        Self::new(base_url, messaging_token)
    }

    pub fn has_token(&self) -> bool {
        self.messaging_token.is_some()
    }

    pub fn sync_url(&self) -> String {
        format!("{}{SYNC_PATH}", self.base_url)
    }

    pub fn user_url(&self) -> String {
        format!("{}{USER_PATH}", self.base_url)
    }

    pub fn disconnect_url(&self) -> String {
        format!("{}{DISCONNECT_PATH}", self.base_url)
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("server URL must not be empty".to_string()))?;
    if !is_http_url(&url) {
        return Err(Error::InvalidInput(format!(
            "server URL must include http:// or https://: {}",
            compact_text(&url)
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}
