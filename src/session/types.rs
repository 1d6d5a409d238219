//! Domain types shared by the live session view, the document tracker and
//! the backend client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::link::Platform;

/// Opaque identifier of one join/recording instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingSessionId(String);

impl MeetingSessionId {
    /// Blank input means "no session" and yields `None`.
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic name for a channel of this session, e.g. `m1_chat`.
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }
}

impl fmt::Display for MeetingSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joining status of the meeting bot, as pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoiningStatus {
    New,
    Import,
    Processing,
    // The backend spells it without the "I".
    #[serde(rename = "WATING_FOR_ADMIT", alias = "WAITING_FOR_ADMIT")]
    WaitingForAdmit,
    Done,
    Failed,
}

impl JoiningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Import => "IMPORT",
            Self::Processing => "PROCESSING",
            Self::WaitingForAdmit => "WAITING_FOR_ADMIT",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    /// The client stops showing join progress once a terminal state arrives.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Post-processing status of a recorded meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TranslateStatus {
    New,
    Processing,
    Done,
    Summary,
    Failed,
}

impl TranslateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Done => "DONE",
            Self::Summary => "SUMMARY",
            Self::Failed => "FAILED",
        }
    }
}

/// One speaker-attributed transcript segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default, rename = "newWords")]
    pub is_new_utterance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
    #[serde(default, rename = "time", alias = "timestamp")]
    pub timestamp: i64,
}

/// A meeting as the backend describes it. Used as session metadata during a
/// live view and as the document record afterwards.
///
/// Unknown fields are kept in `extra` so shallow merges never lose data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub meeting_code: Option<String>,
    #[serde(default)]
    pub joining_status: Option<JoiningStatus>,
    #[serde(default)]
    pub translate_status: Option<TranslateStatus>,
    #[serde(default)]
    pub recording: bool,
    #[serde(default)]
    pub record_uri: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "translationAI")]
    pub translation_ai: Vec<Utterance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeetingRecord {
    /// Shallow merge: every top-level key of `patch` overwrites the same
    /// key of this record, all other keys are preserved.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut merged = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        *self = serde_json::from_value(Value::Object(merged))?;
        Ok(())
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.meeting_code.as_deref())
            .unwrap_or("Untitled")
    }
}

/// Full state fetched once when a session view mounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub recording: bool,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
    #[serde(default)]
    pub transcripts: Vec<Utterance>,
    #[serde(default)]
    pub meeting_detail: Option<MeetingRecord>,
    #[serde(default)]
    pub participants: Option<i64>,
}
