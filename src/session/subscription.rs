//! Binds a fixed set of per-meeting channels for one session id at a time.

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::types::MeetingSessionId;
use crate::transport::{PushHub, Subscription};

/// A fixed set of channels whose topics are `{id}{suffix}`.
pub trait ChannelSet: Copy + Eq + Send + Sync + std::fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn suffix(self) -> &'static str;

    fn topic(self, id: &MeetingSessionId) -> String {
        id.topic(self.suffix())
    }
}

/// Owns the hub registrations for whichever session id is currently bound.
///
/// Rebinding always releases every handler of the previous id first, so
/// handlers never accumulate. Dropping the manager releases everything.
pub struct ChannelSubscriptionManager<C: ChannelSet> {
    hub: PushHub,
    bound: Option<MeetingSessionId>,
    registrations: Vec<(C, Subscription)>,
}

impl<C: ChannelSet> ChannelSubscriptionManager<C> {
    pub fn new(hub: PushHub) -> Self {
        Self {
            hub,
            bound: None,
            registrations: Vec::new(),
        }
    }

    /// Subscribe every channel of `id`, routing payloads to `sink`.
    /// `None` just releases the current binding.
    pub fn bind<F>(&mut self, id: Option<&MeetingSessionId>, sink: F)
    where
        F: Fn(C, &Value) + Send + Sync + 'static,
    {
        self.release_all();

        let Some(id) = id else {
            return;
        };

        let sink = Arc::new(sink);
        for &channel in C::ALL {
            let sink = sink.clone();
            let subscription = self
                .hub
                .subscribe(channel.topic(id), move |payload| sink(channel, payload));
            self.registrations.push((channel, subscription));
        }

        debug!("Bound {} channels for session {}", C::ALL.len(), id);
        self.bound = Some(id.clone());
    }

    /// Stop listening on one channel. Returns `false` if it was not bound.
    pub fn release(&mut self, channel: C) -> bool {
        let Some(pos) = self.registrations.iter().position(|(c, _)| *c == channel) else {
            return false;
        };
        let (_, subscription) = self.registrations.remove(pos);
        debug!("Released {:?} ({})", channel, subscription.topic());
        self.hub.unsubscribe(subscription)
    }

    pub fn release_all(&mut self) {
        for (_, subscription) in self.registrations.drain(..) {
            self.hub.unsubscribe(subscription);
        }
        if let Some(id) = self.bound.take() {
            debug!("Released all channels for session {}", id);
        }
    }

    pub fn bound_id(&self) -> Option<&MeetingSessionId> {
        self.bound.as_ref()
    }

    pub fn active_channels(&self) -> Vec<C> {
        self.registrations.iter().map(|(c, _)| *c).collect()
    }
}

impl<C: ChannelSet> Drop for ChannelSubscriptionManager<C> {
    fn drop(&mut self) {
        self.release_all();
    }
}
