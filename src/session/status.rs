//! Session status tracking and terminal conditions.
//!
//! Status only ever changes because the server pushed it. The tracker merges
//! those pushes into the metadata and reports the side effects the view must
//! carry out: surfacing a terminal notice and releasing channels.

use tracing::{debug, info, warn};

use super::events::{JoiningStatusUpdate, ParticipantUpdate, SessionChannel};
use super::types::{JoiningStatus, MeetingRecord};

/// Where the presentation layer goes once a notice is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Home,
    DocumentDetail,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalNotice {
    /// The bot could not join; the user has to start over.
    JoinFailed,
    /// Nobody but us is left in the meeting.
    MeetingEnded,
    /// The snapshot says this meeting is not being recorded.
    NotRecording,
}

impl TerminalNotice {
    pub fn destination(&self) -> Destination {
        match self {
            Self::JoinFailed => Destination::Home,
            Self::MeetingEnded => Destination::DocumentDetail,
            Self::NotRecording => Destination::Back,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::JoinFailed => "The meeting bot failed to join this meeting.",
            Self::MeetingEnded => "The meeting has ended or no other participant is present.",
            Self::NotRecording => "This meeting is not being recorded.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    Terminal(TerminalNotice),
    /// Stop listening on this channel for the current session.
    Release(SessionChannel),
}

/// Client-side policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// `participants <= threshold` is treated as the meeting having ended.
    pub ended_participant_threshold: i64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ended_participant_threshold: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionStatusTracker {
    policy: SessionPolicy,
    metadata: Option<MeetingRecord>,
    participants: Option<i64>,
    failure_signaled: bool,
    ended_signaled: bool,
}

impl SessionStatusTracker {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Initialise from the snapshot. A snapshot can already describe a failed
    /// join or an emptied meeting, so it goes through the same terminal checks
    /// as pushed updates.
    pub fn load(
        &mut self,
        metadata: Option<MeetingRecord>,
        participants: Option<i64>,
    ) -> Vec<SessionEffect> {
        self.metadata = metadata;
        self.participants = participants;

        let mut effects = Vec::new();
        if self.status() == Some(JoiningStatus::Failed) {
            effects.extend(self.signal_failure());
        }
        if let Some(count) = participants {
            effects.extend(self.check_participants(count));
        }
        effects
    }

    pub fn apply_joining_status(&mut self, update: JoiningStatusUpdate) -> Vec<SessionEffect> {
        if self.failure_signaled {
            debug!("Ignoring joining status after failure was signaled");
            return Vec::new();
        }

        match self.metadata.as_mut() {
            Some(metadata) => {
                if let Err(e) = metadata.merge_patch(&update.patch) {
                    // The typed fields are known-good, so fall back to applying those.
                    warn!("Joining status patch did not merge cleanly: {}", e);
                    metadata.joining_status = Some(update.joining_status);
                    if update.organizer.is_some() {
                        metadata.organizer = update.organizer;
                    }
                }
            }
            None => debug!(
                "No metadata to merge joining status {} into",
                update.joining_status.as_str()
            ),
        }

        info!("Joining status is now {}", update.joining_status.as_str());

        if update.joining_status == JoiningStatus::Failed {
            return self.signal_failure();
        }
        Vec::new()
    }

    pub fn apply_participants(&mut self, update: ParticipantUpdate) -> Vec<SessionEffect> {
        self.participants = Some(update.participant);
        self.check_participants(update.participant)
    }

    fn signal_failure(&mut self) -> Vec<SessionEffect> {
        if self.failure_signaled {
            return Vec::new();
        }
        self.failure_signaled = true;
        vec![
            SessionEffect::Terminal(TerminalNotice::JoinFailed),
            SessionEffect::Release(SessionChannel::JoiningStatus),
        ]
    }

    fn check_participants(&mut self, count: i64) -> Vec<SessionEffect> {
        if count > self.policy.ended_participant_threshold || self.ended_signaled {
            return Vec::new();
        }

        info!(
            "Participant count dropped to {}, treating meeting as ended",
            count
        );
        self.ended_signaled = true;
        vec![SessionEffect::Terminal(TerminalNotice::MeetingEnded)]
    }

    pub fn metadata(&self) -> Option<&MeetingRecord> {
        self.metadata.as_ref()
    }

    pub fn status(&self) -> Option<JoiningStatus> {
        self.metadata.as_ref().and_then(|m| m.joining_status)
    }

    pub fn participants(&self) -> Option<i64> {
        self.participants
    }

    /// Whether the admit/join progress indicator should still be shown.
    pub fn is_join_pending(&self) -> bool {
        self.status().is_some_and(|s| !s.is_terminal() && s != JoiningStatus::Import)
    }
}
