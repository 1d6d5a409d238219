//! Live tracking of a finished meeting's document while the backend
//! translates and summarizes it.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::session::subscription::{ChannelSet, ChannelSubscriptionManager};
use crate::session::types::{MeetingRecord, MeetingSessionId, TranslateStatus, Utterance};
use crate::transport::PushHub;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentChannel {
    Translation,
    Summary,
}

impl ChannelSet for DocumentChannel {
    const ALL: &'static [Self] = &[Self::Translation, Self::Summary];

    fn suffix(self) -> &'static str {
        match self {
            Self::Translation => "_translation",
            Self::Summary => "_summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationUpdate {
    pub status: TranslateStatus,
    #[serde(default)]
    pub transcripts: Vec<Utterance>,
    #[serde(default)]
    pub record_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    Translation(TranslationUpdate),
    /// Shallow patch for the record.
    Summary(Map<String, Value>),
}

#[derive(Debug, Error)]
pub enum DocumentDecodeError {
    #[error("{channel:?} payload is not an object")]
    NotAnObject { channel: DocumentChannel },
    #[error("{channel:?} payload has unexpected shape: {source}")]
    Shape {
        channel: DocumentChannel,
        #[source]
        source: serde_json::Error,
    },
}

pub fn decode(channel: DocumentChannel, payload: &Value) -> Result<DocumentEvent, DocumentDecodeError> {
    let Value::Object(object) = payload else {
        return Err(DocumentDecodeError::NotAnObject { channel });
    };

    match channel {
        DocumentChannel::Translation => TranslationUpdate::deserialize(payload)
            .map(DocumentEvent::Translation)
            .map_err(|source| DocumentDecodeError::Shape { channel, source }),
        DocumentChannel::Summary => Ok(DocumentEvent::Summary(object.clone())),
    }
}

/// Still translating unless the status is final or summarization started.
fn translating(status: Option<TranslateStatus>) -> bool {
    !matches!(
        status,
        None | Some(TranslateStatus::Done | TranslateStatus::Failed | TranslateStatus::Summary)
    )
}

/// Holds a meeting record and folds translation and summary pushes into it.
#[derive(Debug, Default)]
pub struct DocumentTracker {
    record: Option<MeetingRecord>,
    translating: bool,
}

impl DocumentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, record: MeetingRecord) {
        self.translating = translating(record.translate_status);
        self.record = Some(record);
    }

    /// Returns `true` if the record changed. Events before [`load`] are
    /// dropped.
    ///
    /// [`load`]: Self::load
    pub fn apply(&mut self, event: DocumentEvent) -> bool {
        let Some(record) = self.record.as_mut() else {
            debug!("No record loaded, dropping document event");
            return false;
        };

        match event {
            DocumentEvent::Translation(update) => {
                record.translate_status = Some(update.status);
                record.translation_ai = update.transcripts;
                if update.record_uri.is_some() {
                    record.record_uri = update.record_uri;
                }
                self.translating = translating(Some(update.status));
                true
            }
            DocumentEvent::Summary(patch) => match record.merge_patch(&patch) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Summary patch for {} rejected: {}", record.id, e);
                    false
                }
            },
        }
    }

    pub fn record(&self) -> Option<&MeetingRecord> {
        self.record.as_ref()
    }

    pub fn is_translating(&self) -> bool {
        self.translating
    }

    pub fn is_summarizing(&self) -> bool {
        self.record
            .as_ref()
            .and_then(|r| r.translate_status)
            .is_some_and(|s| s == TranslateStatus::Summary)
    }
}

/// Decoded document events for one meeting. Dropping the feed releases its
/// channel handlers.
pub struct DocumentFeed {
    id: MeetingSessionId,
    subscriptions: ChannelSubscriptionManager<DocumentChannel>,
    events: mpsc::UnboundedReceiver<(DocumentChannel, Value)>,
}

impl DocumentFeed {
    pub fn subscribe(hub: PushHub, id: MeetingSessionId) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let mut subscriptions = ChannelSubscriptionManager::new(hub);
        subscriptions.bind(Some(&id), move |channel, payload| {
            let _ = tx.send((channel, payload.clone()));
        });
        Self {
            id,
            subscriptions,
            events,
        }
    }

    pub fn id(&self) -> &MeetingSessionId {
        &self.id
    }

    /// Next well-formed event. Malformed payloads are logged and skipped.
    pub async fn next(&mut self) -> Option<DocumentEvent> {
        while let Some((channel, payload)) = self.events.recv().await {
            match decode(channel, &payload) {
                Ok(event) => return Some(event),
                Err(e) => warn!(
                    "Dropping malformed push on {}: {}",
                    channel.topic(&self.id),
                    e
                ),
            }
        }
        None
    }

    pub fn close(mut self) {
        self.subscriptions.release_all();
    }
}
