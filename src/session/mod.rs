//! Live meeting session view.
//!
//! Subscribes to a meeting's push channels and folds chat, transcript,
//! participant and joining-status events into one view model:
//!
//! subscription → decode → aggregators → view model → presentation

pub mod chat;
pub mod driver;
pub mod events;
pub mod live;
pub mod status;
pub mod subscription;
pub mod transcript;
pub mod types;
pub mod view;

pub use driver::{SessionNotice, SessionView, SnapshotSource};
pub use events::{SessionChannel, SessionEvent};
pub use live::LiveSession;
pub use status::{Destination, SessionEffect, SessionPolicy, TerminalNotice};
pub use subscription::{ChannelSet, ChannelSubscriptionManager};
pub use types::{
    ChatMessage, JoiningStatus, MeetingRecord, MeetingSessionId, SessionSnapshot, TranslateStatus,
    Utterance,
};
pub use view::SessionViewModel;
