//! Websocket connection to the push server.
//!
//! One background task owns the socket, answers heartbeats and feeds every
//! event into the [`PushHub`]. Dropped connections are retried with
//! exponential backoff; events published while disconnected are lost.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::frame::{self, Frame, CONNECT, DISCONNECT, PONG};
use super::hub::PushHub;
use crate::auth::Credentials;
use crate::config::Config;

/// Emitted after every namespace connect so the server can route per-user
/// events.
pub const USER_CONNECTION_EVENT: &str = "user-connection";

const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Used until the server's open packet says otherwise.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid push URL: {0}")]
    InvalidUrl(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Server refused connection: {0}")]
    Refused(String),

    #[error("No heartbeat from server within {0:?}")]
    Idle(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSettings {
    /// Push origin, e.g. `https://meet.example.com`.
    pub url: String,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
}

impl PushSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.backend.push_url(),
            reconnect_initial: config.push.reconnect_initial(),
            reconnect_max: config.push.reconnect_max(),
        }
    }
}

/// Websocket endpoint for a push origin.
pub fn socket_endpoint(url: &str) -> Result<String, TransportError> {
    let url = url.trim().trim_end_matches('/');
    let base = if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else {
        return Err(TransportError::InvalidUrl(url.to_string()));
    };
    Ok(format!("{}{}", base, SOCKET_PATH))
}

pub struct PushConnection {
    hub: PushHub,
    settings: PushSettings,
    user_id: Option<String>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PushConnection {
    pub fn new(hub: PushHub, settings: PushSettings) -> Self {
        Self {
            hub,
            settings,
            user_id: None,
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    pub fn hub(&self) -> &PushHub {
        &self.hub
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Follow the auth state: connected while a user is signed in,
    /// disconnected otherwise.
    pub async fn sync_auth(&mut self, credentials: &Credentials) -> Result<(), TransportError> {
        let user_id = credentials
            .user_id()
            .filter(|_| credentials.is_authenticated());

        match user_id {
            Some(id) if self.is_active() && self.user_id.as_deref() == Some(id) => Ok(()),
            Some(id) => {
                let id = id.to_string();
                self.disconnect().await;
                self.connect(&id)
            }
            None => {
                self.disconnect().await;
                Ok(())
            }
        }
    }

    /// Start the background connection for `user_id`. Must be called from
    /// within a Tokio runtime.
    pub fn connect(&mut self, user_id: &str) -> Result<(), TransportError> {
        let endpoint = socket_endpoint(&self.settings.url)?;
        if self.is_active() {
            self.shutdown.cancel();
        }

        self.shutdown = CancellationToken::new();
        self.user_id = Some(user_id.to_string());

        info!("Starting push connection to {}", endpoint);
        self.task = Some(tokio::spawn(run(
            endpoint,
            user_id.to_string(),
            self.hub.clone(),
            self.settings.clone(),
            self.shutdown.clone(),
        )));
        Ok(())
    }

    /// Stop the connection and wait for the socket task to finish.
    pub async fn disconnect(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Push connection task ended abnormally: {}", e);
            }
            info!("Push connection stopped");
        }
        self.user_id = None;
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run(
    endpoint: String,
    user_id: String,
    hub: PushHub,
    settings: PushSettings,
    shutdown: CancellationToken,
) {
    let mut backoff = settings.reconnect_initial;

    loop {
        match connect_and_stream(&endpoint, &user_id, &hub, &shutdown).await {
            Ok(()) => {
                debug!("Push connection closed");
                backoff = settings.reconnect_initial;
            }
            Err(e) => {
                warn!(
                    "Push connection failed: {} (retrying in {:?})",
                    e, backoff
                );
            }
        }

        if shutdown.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(settings.reconnect_max);
    }
}

async fn connect_and_stream(
    endpoint: &str,
    user_id: &str,
    hub: &PushHub,
    shutdown: &CancellationToken,
) -> Result<(), TransportError> {
    let connecting = tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        result = connect_async(endpoint) => result,
    };
    let (ws_stream, _) = connecting?;
    let (mut sink, mut stream) = ws_stream.split();
    let mut idle_timeout = DEFAULT_IDLE_TIMEOUT;

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(Message::Text(DISCONNECT.to_string().into())).await;
                let _ = sink.close().await;
                return Ok(());
            }
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };

        let message = match next {
            Ok(Some(message)) => message?,
            Ok(None) => return Ok(()),
            Err(_) => return Err(TransportError::Idle(idle_timeout)),
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(()),
            _ => continue,
        };

        match frame::decode(text.as_str()) {
            Ok(Frame::Open(open)) => {
                idle_timeout = Duration::from_millis(open.ping_interval + open.ping_timeout);
                debug!("Push handshake complete (sid {})", open.sid);
                sink.send(Message::Text(CONNECT.to_string().into())).await?;
            }
            Ok(Frame::Ping) => {
                sink.send(Message::Text(PONG.to_string().into())).await?;
            }
            Ok(Frame::Connected { sid }) => {
                info!("Push namespace connected ({})", sid.as_deref().unwrap_or("-"));
                let hello = frame::encode_event(USER_CONNECTION_EVENT, &json!({ "userId": user_id }));
                sink.send(Message::Text(hello.into())).await?;
            }
            Ok(Frame::Event { topic, payload }) => {
                let delivered = hub.dispatch(&topic, &payload);
                trace!("Push event {} delivered to {} handlers", topic, delivered);
            }
            Ok(Frame::ConnectError(detail)) => {
                return Err(TransportError::Refused(detail.to_string()));
            }
            Ok(Frame::Disconnected) | Ok(Frame::Close) => return Ok(()),
            Ok(Frame::Pong) | Ok(Frame::Noop) | Ok(Frame::Ack) => {}
            Err(e) => warn!("Ignoring malformed push frame: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserInfo;

    fn settings() -> PushSettings {
        PushSettings {
            url: "http://127.0.0.1:9".to_string(),
            reconnect_initial: Duration::from_millis(10),
            reconnect_max: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_socket_endpoint_schemes() {
        assert_eq!(
            socket_endpoint("https://meet.example.com/").unwrap(),
            "wss://meet.example.com/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(
            socket_endpoint("http://localhost:8911").unwrap(),
            "ws://localhost:8911/socket.io/?EIO=4&transport=websocket"
        );
        assert!(matches!(
            socket_endpoint("meet.example.com"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.backend.url = "https://meet.example.com/api/v1".to_string();
        let settings = PushSettings::from_config(&config);
        assert_eq!(settings.url, "https://meet.example.com");
        assert_eq!(settings.reconnect_initial, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sync_auth_follows_credentials() {
        let mut connection = PushConnection::new(PushHub::new(), settings());

        connection.sync_auth(&Credentials::default()).await.unwrap();
        assert!(!connection.is_active());

        let credentials = Credentials {
            access_token: Some("token".to_string()),
            refresh_token: None,
            user_info: Some(UserInfo {
                id: "u1".to_string(),
                ..UserInfo::default()
            }),
        };
        connection.sync_auth(&credentials).await.unwrap();
        assert!(connection.is_active());
        assert_eq!(connection.user_id(), Some("u1"));

        connection.sync_auth(&Credentials::default()).await.unwrap();
        assert!(!connection.is_active());
        assert_eq!(connection.user_id(), None);
    }
}
