//! Persistent CLI configuration: the sync server and messaging token.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spidernotes_core::config::ServerConfig;
use spidernotes_core::util::{is_http_url, normalize_text_option};

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CliConfig")
            .field("version", &self.version)
            .field("server_url", &self.server_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            server_url: None,
            token: None,
        }
    }
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join("spidernotes").join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".to_string()))
}

impl CliConfig {
    pub fn load() -> Result<Self, CliError> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, CliError> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Merge explicit values over the stored ones.
    pub fn apply(&mut self, server_url: Option<String>, token: Option<String>) -> Result<(), CliError> {
        if let Some(url) = normalize_text_option(server_url) {
            if !is_http_url(&url) {
                return Err(CliError::Config(
                    "server_url must include http:// or https://".to_string(),
                ));
            }
            self.server_url = Some(url);
        }
        if let Some(token) = normalize_text_option(token) {
            self.token = Some(token);
        }
        Ok(())
    }

    /// Server settings with the environment taking precedence over the file.
    pub fn server_config(&self) -> Result<ServerConfig, CliError> {
        Ok(ServerConfig::resolve(
            self.server_url.clone(),
            self.token.clone(),
        )?)
    }

    fn normalize(&mut self) {
        self.server_url = normalize_text_option(self.server_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.token = normalize_text_option(self.token.take());
    }
}
