use serde::Serialize;

use super::types::{ChatMessage, JoiningStatus, MeetingRecord, MeetingSessionId, Utterance};

/// Read-only state handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionViewModel {
    pub id: MeetingSessionId,
    /// True until the snapshot has been applied.
    pub loading: bool,
    pub metadata: Option<MeetingRecord>,
    pub status: Option<JoiningStatus>,
    pub utterances: Vec<Utterance>,
    pub chat_messages: Vec<ChatMessage>,
    pub participants: Option<i64>,
    pub join_pending: bool,
}

impl SessionViewModel {
    pub fn loading(id: MeetingSessionId) -> Self {
        Self {
            id,
            loading: true,
            metadata: None,
            status: None,
            utterances: Vec::new(),
            chat_messages: Vec::new(),
            participants: None,
            join_pending: false,
        }
    }
}
