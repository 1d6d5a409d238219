//! Decoding of loosely-typed push payloads into session events.
//!
//! Every payload crosses this boundary exactly once. Anything that does not
//! match the expected shape for its channel becomes a [`DecodeError`] and is
//! dropped by the caller.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::subscription::ChannelSet;
use super::types::{ChatMessage, JoiningStatus};

/// Per-meeting channels of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionChannel {
    Chat,
    Stream,
    Participant,
    JoiningStatus,
}

impl ChannelSet for SessionChannel {
    const ALL: &'static [Self] = &[
        Self::Chat,
        Self::Stream,
        Self::Participant,
        Self::JoiningStatus,
    ];

    fn suffix(self) -> &'static str {
        match self {
            Self::Chat => "_chat",
            Self::Stream => "_stream",
            Self::Participant => "_participant",
            Self::JoiningStatus => "_joining_status",
        }
    }
}

/// Transcript fragment from the `_stream` channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptFragment {
    /// `true` starts a new utterance, `false` refines the last one.
    #[serde(default)]
    pub new_words: bool,
    #[serde(default)]
    pub speaker: Option<String>,
    pub transcript: String,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ParticipantUpdate {
    pub participant: i64,
}

/// Joining-status push. `patch` is the whole payload, applied as a shallow
/// merge onto the session metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct JoiningStatusUpdate {
    pub joining_status: JoiningStatus,
    pub organizer: Option<String>,
    pub patch: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoiningStatusShape {
    joining_status: JoiningStatus,
    #[serde(default)]
    organizer: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Chat(ChatMessage),
    Transcript(TranscriptFragment),
    Participants(ParticipantUpdate),
    JoiningStatus(JoiningStatusUpdate),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{channel:?} payload is not an object")]
    NotAnObject { channel: SessionChannel },
    #[error("{channel:?} payload has unexpected shape: {source}")]
    Shape {
        channel: SessionChannel,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode a raw payload delivered on `channel`.
pub fn decode(channel: SessionChannel, payload: &Value) -> Result<SessionEvent, DecodeError> {
    let Value::Object(object) = payload else {
        return Err(DecodeError::NotAnObject { channel });
    };
    let shape = |source: serde_json::Error| DecodeError::Shape { channel, source };

    match channel {
        SessionChannel::Chat => ChatMessage::deserialize(payload)
            .map(SessionEvent::Chat)
            .map_err(shape),
        SessionChannel::Stream => TranscriptFragment::deserialize(payload)
            .map(SessionEvent::Transcript)
            .map_err(shape),
        SessionChannel::Participant => ParticipantUpdate::deserialize(payload)
            .map(SessionEvent::Participants)
            .map_err(shape),
        SessionChannel::JoiningStatus => {
            let parsed = JoiningStatusShape::deserialize(payload).map_err(shape)?;
            Ok(SessionEvent::JoiningStatus(JoiningStatusUpdate {
                joining_status: parsed.joining_status,
                organizer: parsed.organizer,
                patch: object.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::MeetingSessionId;
    use serde_json::json;

    #[test]
    fn test_topics_are_suffixed_ids() {
        let id = MeetingSessionId::parse("m1").unwrap();
        let topics: Vec<String> = SessionChannel::ALL.iter().map(|c| c.topic(&id)).collect();
        assert_eq!(
            topics,
            vec!["m1_chat", "m1_stream", "m1_participant", "m1_joining_status"]
        );
    }

    #[test]
    fn test_decode_chat() {
        let event = decode(
            SessionChannel::Chat,
            &json!({"sender": "Bo", "message": "hello", "time": 42}),
        )
        .unwrap();
        assert_eq!(
            event,
            SessionEvent::Chat(ChatMessage {
                sender: "Bo".to_string(),
                message: "hello".to_string(),
                timestamp: 42,
            })
        );
    }

    #[test]
    fn test_decode_refinement_without_speaker() {
        let event = decode(
            SessionChannel::Stream,
            &json!({"newWords": false, "transcript": "hello there"}),
        )
        .unwrap();
        let SessionEvent::Transcript(fragment) = event else {
            panic!("expected transcript event");
        };
        assert!(!fragment.new_words);
        assert!(fragment.speaker.is_none());
        assert_eq!(fragment.transcript, "hello there");
    }

    #[test]
    fn test_decode_joining_status_keeps_patch() {
        let event = decode(
            SessionChannel::JoiningStatus,
            &json!({"joiningStatus": "FAILED", "organizer": "Ana"}),
        )
        .unwrap();
        let SessionEvent::JoiningStatus(update) = event else {
            panic!("expected joining status event");
        };
        assert_eq!(update.joining_status, JoiningStatus::Failed);
        assert_eq!(update.organizer.as_deref(), Some("Ana"));
        assert_eq!(update.patch.len(), 2);
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        assert!(matches!(
            decode(SessionChannel::Chat, &Value::Null),
            Err(DecodeError::NotAnObject { .. })
        ));
        assert!(matches!(
            decode(SessionChannel::Stream, &json!({"newWords": true})),
            Err(DecodeError::Shape { .. })
        ));
        assert!(matches!(
            decode(SessionChannel::Participant, &json!({"participant": "many"})),
            Err(DecodeError::Shape { .. })
        ));
        assert!(matches!(
            decode(SessionChannel::JoiningStatus, &json!({"joiningStatus": "EXPLODED"})),
            Err(DecodeError::Shape { .. })
        ));
    }
}
