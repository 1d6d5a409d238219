//! Text frames of the push protocol (Engine.IO v4 carrying Socket.IO v5).
//!
//! Only the subset the client needs is understood: the handshake, heartbeat,
//! namespace connect/disconnect and plain events. Binary attachments are
//! rejected.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Reply to a server ping.
pub const PONG: &str = "3";
/// Connect to the default namespace.
pub const CONNECT: &str = "40";
/// Leave the default namespace.
pub const DISCONNECT: &str = "41";

/// Handshake parameters the server sends in its open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace accepted the connection.
    Connected { sid: Option<String> },
    Disconnected,
    ConnectError(Value),
    /// An emitted event; `payload` is the first argument or `null`.
    Event { topic: String, payload: Value },
    /// Acknowledgement of an event we emitted; the client never asks for one.
    Ack,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownPacket(char),

    #[error("binary packets are not supported")]
    Binary,

    #[error("event frame has no topic")]
    MissingTopic,

    #[error("invalid frame body: {0}")]
    Body(#[from] serde_json::Error),
}

pub fn decode(text: &str) -> Result<Frame, FrameError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(FrameError::Empty)?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => decode_message(rest),
        '6' => Ok(Frame::Noop),
        'b' => Err(FrameError::Binary),
        other => Err(FrameError::UnknownPacket(other)),
    }
}

fn decode_message(text: &str) -> Result<Frame, FrameError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(FrameError::Empty)?;
    let body = strip_ack_id(strip_namespace(chars.as_str()));

    match kind {
        '0' => {
            let sid = if body.is_empty() {
                None
            } else {
                let value: Value = serde_json::from_str(body)?;
                value.get("sid").and_then(Value::as_str).map(str::to_string)
            };
            Ok(Frame::Connected { sid })
        }
        '1' => Ok(Frame::Disconnected),
        '2' => {
            let args: Vec<Value> = serde_json::from_str(body)?;
            let mut args = args.into_iter();
            let topic = match args.next() {
                Some(Value::String(topic)) => topic,
                _ => return Err(FrameError::MissingTopic),
            };
            Ok(Frame::Event {
                topic,
                payload: args.next().unwrap_or(Value::Null),
            })
        }
        '3' => Ok(Frame::Ack),
        '4' => {
            let detail = if body.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(body)?
            };
            Ok(Frame::ConnectError(detail))
        }
        '5' | '6' => Err(FrameError::Binary),
        other => Err(FrameError::UnknownPacket(other)),
    }
}

/// `/admin,["x"]` → `["x"]`. Namespaces other than `/` are not joined, so
/// the name itself is ignored.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn strip_ack_id(body: &str) -> &str {
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

/// Encode an event emitted to the server.
pub fn encode_event(topic: &str, payload: &Value) -> String {
    format!("42{}", Value::Array(vec![Value::from(topic), payload.clone()]))
}
