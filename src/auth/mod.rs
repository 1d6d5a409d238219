//! Persisted credentials and the authenticated user.
//!
//! The access token is attached to every backend request, and the presence
//! of a signed-in user decides whether the push connection is open.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::global;

/// Tokens and profile returned by sign-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub register_google_calendar: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user_id().is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_info
            .as_ref()
            .map(|user| user.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// JSON file holding the current credentials.
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        Ok(Self::new(global::auth_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means signed out.
    pub fn load(&self) -> Result<Credentials> {
        if !self.path.exists() {
            debug!("No credentials at {:?}", self.path);
            return Ok(Credentials::default());
        }

        let content =
            std::fs::read_to_string(&self.path).context("Failed to read credentials file")?;
        serde_json::from_str(&content).context("Failed to parse credentials file")
    }

    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(credentials).context("Failed to serialize credentials")?;
        std::fs::write(&self.path, content).context("Failed to write credentials file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .context("Failed to restrict credentials file permissions")?;
        }

        info!("Saved credentials to {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove credentials file")?;
            info!("Cleared credentials at {:?}", self.path);
        }
        Ok(())
    }
}
