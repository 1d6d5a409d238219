//! Command handlers. Each command loads a [`CliContext`] and talks to the
//! backend through [`BackendClient`].

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::api::BackendClient;
use crate::auth::{AuthStore, Credentials};
use crate::config::Config;
use crate::session::{MeetingSessionId, SessionPolicy};

pub mod args;
pub mod auth;
pub mod meeting;
pub mod records;
pub mod render;

pub use args::{Cli, CliCommand};
pub use auth::{
    handle_login_command, handle_logout_command, handle_register_command,
    handle_session_expired, handle_verify_command,
};
pub use meeting::{
    handle_classify_command, handle_join_command, handle_live_command, handle_stop_command,
    handle_watch_command,
};
pub use records::{
    handle_calendar_command, handle_records_command, handle_show_command, handle_summary_command,
    handle_upload_command,
};

/// Loaded configuration and credentials shared by all commands.
pub struct CliContext {
    pub config: Config,
    pub auth: AuthStore,
    pub credentials: Credentials,
}

impl CliContext {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let auth = AuthStore::default_location()?;
        let credentials = auth.load()?;
        Ok(Self {
            config,
            auth,
            credentials,
        })
    }

    pub fn client(&self) -> BackendClient {
        BackendClient::from_config(&self.config.backend)
            .with_access_token(self.credentials.access_token.clone())
    }

    pub fn require_login(&self) -> Result<()> {
        if !self.credentials.is_authenticated() {
            bail!("Not logged in. Run `meetcap login` first.");
        }
        Ok(())
    }

    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            ended_participant_threshold: self.config.session.ended_participant_threshold,
        }
    }

    pub fn language(&self, requested: Option<String>) -> String {
        requested
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.config.session.language.clone())
    }
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

pub(crate) fn parse_session_id(raw: &str) -> Result<MeetingSessionId> {
    match MeetingSessionId::parse(raw) {
        Some(id) => Ok(id),
        None => bail!("Meeting id must not be empty"),
    }
}

/// Spinner for a request that may take a while.
pub(crate) fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
