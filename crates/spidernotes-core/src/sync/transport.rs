//! Remote exchange with the Spider Notes server.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ServerConfig;
use crate::models::{Note, User};

const MESSAGING_TOKEN_HEADER: &str = "X-Messaging-Token";
const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid server configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync API error: {0}")]
    Api(String),
    #[error("Invalid sync payload: {0}")]
    InvalidPayload(String),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Body of `POST /api/sync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Server cursor of the previous successful sync; 0 forces a full pull
    pub last_synchronized: i64,
    /// Outgoing notes with `body`/`url` already encrypted when enabled
    pub notes: Vec<Note>,
}

/// Reply to `POST /api/sync`.
///
/// The cursor is required; a reply without it is rejected as a malformed
/// payload so the cycle leaves local state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// New server cursor
    pub last_synchronized: i64,
    /// Notes changed on the server since the previous cursor
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// One batched request/response exchange with the server.
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    async fn exchange(&self, request: &SyncRequest) -> TransportResult<SyncResponse>;
}

/// `reqwest` client for the server JSON API.
#[derive(Clone)]
pub struct HttpSyncTransport {
    config: ServerConfig,
    client: reqwest::Client,
}

impl HttpSyncTransport {
    pub fn new(config: ServerConfig) -> TransportResult<Self> {
        Ok(Self {
            config,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?,
        })
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Fetch the account attached to the messaging token.
    pub async fn get_user(&self) -> TransportResult<User> {
        let request = self.authorized(self.client.get(self.config.user_url()))?;
        let mut user: User = Self::send_json(request).await?;
        self.keep_token(&mut user);
        Ok(user)
    }

    /// Disconnect the social login account from this device.
    pub async fn disconnect_user(&self) -> TransportResult<User> {
        let request = self.authorized(self.client.post(self.config.disconnect_url()))?;
        let mut user: User = Self::send_json(request).await?;
        self.keep_token(&mut user);
        Ok(user)
    }

    /// Delete the account and every note stored on the server.
    pub async fn delete_user(&self) -> TransportResult<()> {
        let request = self.authorized(self.client.delete(self.config.user_url()))?;
        let response = request.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> TransportResult<RequestBuilder> {
        let token = self.config.messaging_token.as_deref().ok_or_else(|| {
            TransportError::InvalidConfiguration("messaging token is not configured".to_string())
        })?;
        Ok(request
            .header(MESSAGING_TOKEN_HEADER, token)
            .header("Accept", "application/json"))
    }

    fn keep_token(&self, user: &mut User) {
        if !user.has_token() {
            if let Some(token) = self.config.messaging_token.as_deref() {
                user.token = token.to_string();
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> TransportResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Api(parse_api_error(status, &body)))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        request: RequestBuilder,
    ) -> TransportResult<T> {
        let response = Self::check_status(request.send().await?).await?;
        let body = response.text().await?;
        decode_payload(&body)
    }
}

/// Parse a JSON reply body, reporting failures as [`TransportError::InvalidPayload`].
pub(crate) fn decode_payload<T: serde::de::DeserializeOwned>(body: &str) -> TransportResult<T> {
    serde_json::from_str(body).map_err(|error| {
        TransportError::InvalidPayload(format!("{error}: {}", crate::util::compact_text(body)))
    })
}

impl SyncTransport for HttpSyncTransport {
    async fn exchange(&self, request: &SyncRequest) -> TransportResult<SyncResponse> {
        let builder = self.authorized(self.client.post(self.config.sync_url()))?;
        tracing::debug!(
            "POST {} with {} notes since {}",
            self.config.sync_url(),
            request.notes.len(),
            request.last_synchronized
        );
        Self::send_json(builder.json(request)).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = crate::util::compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
