use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Overrides `backend.url` when set.
pub const ENV_BACKEND_URL: &str = "MEETCAP_BACKEND_URL";
/// Overrides `session.language` when set.
pub const ENV_LANGUAGE: &str = "MEETCAP_LANGUAGE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub push: PushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend origin. May already include the `/api/<version>` prefix.
    pub url: String,
    pub api_version: String,
    pub request_timeout_seconds: u64,
    /// The bot has to actually reach the meeting before join returns.
    pub join_timeout_seconds: u64,
    pub stop_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Language code sent with join and summary requests.
    pub language: String,
    /// A participant count at or below this value ends the live view.
    pub ended_participant_threshold: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8911".to_string(),
            api_version: "v1".to_string(),
            request_timeout_seconds: 30,
            join_timeout_seconds: 45,
            stop_timeout_seconds: 60,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            ended_participant_threshold: 1,
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            reconnect_initial_ms: 1000,
            reconnect_max_ms: 30_000,
        }
    }
}

impl BackendConfig {
    /// Base URL for REST calls, e.g. `http://host:8911/api/v1`.
    pub fn api_base_url(&self) -> String {
        let url = self.url.trim_end_matches('/');
        if url.contains("/api/") {
            url.to_string()
        } else {
            format!("{}/api/{}", url, self.api_version)
        }
    }

    /// Origin of the push transport, with any `/api/...` suffix removed.
    pub fn push_url(&self) -> String {
        let url = self.url.trim_end_matches('/');
        match url.find("/api/") {
            Some(idx) => url[..idx].to_string(),
            None => url.to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_seconds)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_seconds)
    }
}

/// Lower bound for the first reconnect delay; the backoff doubles from here.
const MIN_RECONNECT_MS: u64 = 100;

impl PushConfig {
    pub fn reconnect_initial(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms.max(MIN_RECONNECT_MS))
    }

    /// Never below the initial delay.
    pub fn reconnect_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms).max(self.reconnect_initial())
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config.with_env_overrides());
        }

        let config = Self::load_from(&config_path)?;
        info!("Loaded config from {:?}", config_path);
        Ok(config.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            if !url.trim().is_empty() {
                self.backend.url = url.trim().to_string();
            }
        }
        if let Ok(language) = std::env::var(ENV_LANGUAGE) {
            if !language.trim().is_empty() {
                self.session.language = language.trim().to_string();
            }
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
