//! Composition of the session aggregators.
//!
//! `LiveSession` is the synchronous core of a mounted session view: it takes
//! the snapshot once, then folds decoded events in arrival order.

use tracing::debug;

use super::chat::ChatAggregator;
use super::events::SessionEvent;
use super::status::{SessionEffect, SessionPolicy, SessionStatusTracker, TerminalNotice};
use super::transcript::TranscriptAggregator;
use super::types::{MeetingSessionId, SessionSnapshot};
use super::view::SessionViewModel;

pub struct LiveSession {
    id: MeetingSessionId,
    transcript: TranscriptAggregator,
    chat: ChatAggregator,
    status: SessionStatusTracker,
    snapshot_loaded: bool,
    /// Status events seen while the snapshot was in flight.
    pending: Vec<SessionEvent>,
}

impl LiveSession {
    pub fn new(id: MeetingSessionId, policy: SessionPolicy) -> Self {
        Self {
            id,
            transcript: TranscriptAggregator::new(),
            chat: ChatAggregator::new(),
            status: SessionStatusTracker::new(policy),
            snapshot_loaded: false,
            pending: Vec::new(),
        }
    }

    pub fn id(&self) -> &MeetingSessionId {
        &self.id
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot_loaded
    }

    /// Seed all state from the snapshot, then replay status events held back
    /// while it was loading. A snapshot for a meeting that is not recording
    /// leaves the session unloaded and reports why.
    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot) -> Vec<SessionEffect> {
        if !snapshot.recording {
            self.pending.clear();
            return vec![SessionEffect::Terminal(TerminalNotice::NotRecording)];
        }

        self.transcript.reset(snapshot.transcripts);
        self.chat.reset(snapshot.chat_messages);
        let mut effects = self
            .status
            .load(snapshot.meeting_detail, snapshot.participants);
        self.snapshot_loaded = true;

        for event in std::mem::take(&mut self.pending) {
            effects.extend(self.apply(event));
        }

        debug!(
            "Session {} loaded: {} utterances, {} chat messages",
            self.id,
            self.transcript.len(),
            self.chat.len()
        );
        effects
    }

    /// Fold one event. Chat and transcript events that arrive before the
    /// snapshot are dropped since the snapshot covers them. Participant and
    /// joining-status events are held and replayed once it lands.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        if !self.snapshot_loaded {
            match event {
                SessionEvent::Participants(_) | SessionEvent::JoiningStatus(_) => {
                    debug!("Session {} not loaded yet, holding {:?}", self.id, event);
                    self.pending.push(event);
                }
                _ => debug!("Session {} not loaded yet, dropping {:?}", self.id, event),
            }
            return Vec::new();
        }

        match event {
            SessionEvent::Chat(message) => {
                self.chat.push(message);
                Vec::new()
            }
            SessionEvent::Transcript(fragment) => {
                self.transcript.apply(fragment);
                Vec::new()
            }
            SessionEvent::Participants(update) => self.status.apply_participants(update),
            SessionEvent::JoiningStatus(update) => self.status.apply_joining_status(update),
        }
    }

    pub fn view(&self) -> SessionViewModel {
        SessionViewModel {
            id: self.id.clone(),
            loading: !self.snapshot_loaded,
            metadata: self.status.metadata().cloned(),
            status: self.status.status(),
            utterances: self.transcript.utterances().to_vec(),
            chat_messages: self.chat.messages().to_vec(),
            participants: self.status.participants(),
            join_pending: self.status.is_join_pending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::events::{decode, SessionChannel};
    use crate::session::types::{JoiningStatus, MeetingRecord, Utterance};
    use serde_json::json;

    fn id() -> MeetingSessionId {
        MeetingSessionId::parse("m1").unwrap()
    }

    fn recording_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            recording: true,
            meeting_detail: Some(MeetingRecord {
                id: "m1".to_string(),
                joining_status: Some(JoiningStatus::Processing),
                ..MeetingRecord::default()
            }),
            ..SessionSnapshot::default()
        }
    }

    fn event(channel: SessionChannel, payload: serde_json::Value) -> SessionEvent {
        decode(channel, &payload).unwrap()
    }

    #[test]
    fn test_events_before_snapshot_are_dropped() {
        let mut session = LiveSession::new(id(), SessionPolicy::default());
        session.apply(event(
            SessionChannel::Chat,
            json!({"sender": "Bo", "message": "early", "time": 1}),
        ));

        let view = session.view();
        assert!(view.loading);
        assert!(view.chat_messages.is_empty());
    }

    #[test]
    fn test_status_events_before_snapshot_are_replayed() {
        let mut session = LiveSession::new(id(), SessionPolicy::default());
        assert!(session
            .apply(event(SessionChannel::Participant, json!({"participant": 1})))
            .is_empty());
        assert!(session
            .apply(event(
                SessionChannel::JoiningStatus,
                json!({"joiningStatus": "FAILED"}),
            ))
            .is_empty());

        let mut snapshot = recording_snapshot();
        snapshot.participants = Some(3);
        let effects = session.apply_snapshot(snapshot);

        assert_eq!(
            effects,
            vec![
                SessionEffect::Terminal(TerminalNotice::MeetingEnded),
                SessionEffect::Terminal(TerminalNotice::JoinFailed),
                SessionEffect::Release(SessionChannel::JoiningStatus),
            ]
        );
        let view = session.view();
        assert_eq!(view.participants, Some(1));
        assert_eq!(view.status, Some(JoiningStatus::Failed));
    }

    #[test]
    fn test_failed_snapshot_is_terminal() {
        let mut session = LiveSession::new(id(), SessionPolicy::default());
        let mut snapshot = recording_snapshot();
        if let Some(detail) = snapshot.meeting_detail.as_mut() {
            detail.joining_status = Some(JoiningStatus::Failed);
        }
        snapshot.participants = Some(1);

        let effects = session.apply_snapshot(snapshot);
        assert_eq!(
            effects,
            vec![
                SessionEffect::Terminal(TerminalNotice::JoinFailed),
                SessionEffect::Release(SessionChannel::JoiningStatus),
                SessionEffect::Terminal(TerminalNotice::MeetingEnded),
            ]
        );
        assert!(session.is_loaded());
    }

    #[test]
    fn test_not_recording_snapshot() {
        let mut session = LiveSession::new(id(), SessionPolicy::default());
        let effects = session.apply_snapshot(SessionSnapshot::default());

        assert_eq!(
            effects,
            vec![SessionEffect::Terminal(TerminalNotice::NotRecording)]
        );
        assert!(!session.is_loaded());
    }

    #[test]
    fn test_stream_scenario() {
        let mut session = LiveSession::new(id(), SessionPolicy::default());
        assert!(session.apply_snapshot(recording_snapshot()).is_empty());

        session.apply(event(
            SessionChannel::Stream,
            json!({"newWords": true, "speaker": "A", "transcript": "hello", "start": 0, "end": 500}),
        ));
        session.apply(event(
            SessionChannel::Stream,
            json!({"newWords": false, "transcript": "hello there"}),
        ));

        let view = session.view();
        assert_eq!(
            view.utterances,
            vec![Utterance {
                speaker: "A".to_string(),
                transcript: "hello there".to_string(),
                start: 0.0,
                end: 500.0,
                is_new_utterance: true,
            }]
        );
        assert_eq!(view.status, Some(JoiningStatus::Processing));
        assert!(view.join_pending);
    }

    #[test]
    fn test_snapshot_seeds_lists() {
        let mut session = LiveSession::new(id(), SessionPolicy::default());
        let mut snapshot = recording_snapshot();
        snapshot.transcripts = vec![Utterance {
            speaker: "A".to_string(),
            transcript: "earlier".to_string(),
            ..Utterance::default()
        }];
        snapshot.participants = Some(4);
        session.apply_snapshot(snapshot);

        session.apply(event(
            SessionChannel::Stream,
            json!({"newWords": false, "transcript": "earlier, refined"}),
        ));

        let view = session.view();
        assert_eq!(view.utterances.len(), 1);
        assert_eq!(view.utterances[0].transcript, "earlier, refined");
        assert_eq!(view.participants, Some(4));
    }

    #[test]
    fn test_routes_status_effects() {
        let mut session = LiveSession::new(id(), SessionPolicy::default());
        session.apply_snapshot(recording_snapshot());

        let effects = session.apply(event(SessionChannel::Participant, json!({"participant": 1})));
        assert_eq!(
            effects,
            vec![SessionEffect::Terminal(TerminalNotice::MeetingEnded)]
        );

        let effects = session.apply(event(
            SessionChannel::JoiningStatus,
            json!({"joiningStatus": "FAILED"}),
        ));
        assert_eq!(effects.len(), 2);
        assert_eq!(session.view().status, Some(JoiningStatus::Failed));
    }
}
