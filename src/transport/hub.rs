//! Topic-keyed handler registry for the shared push connection.
//!
//! The connection task feeds every incoming event into [`PushHub::dispatch`].
//! Consumers register handlers with [`PushHub::subscribe`] and own the
//! returned [`Subscription`]; releasing it is their job.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Handle for one registered handler. Deliberately not `Clone`.
#[derive(Debug)]
#[must_use = "a dropped Subscription handle cannot be released"]
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<(SubscriptionId, EventHandler)>>>,
}

#[derive(Clone, Default)]
pub struct PushHub {
    inner: Arc<HubInner>,
}

impl PushHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<String, Vec<(SubscriptionId, EventHandler)>>> {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers()
            .entry(topic.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        debug!("Subscribed handler {:?} to {}", id, topic);
        Subscription { id, topic }
    }

    /// Returns `false` if the handler was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut handlers = self.handlers();
        let Some(list) = handlers.get_mut(&subscription.topic) else {
            return false;
        };

        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&subscription.topic);
        }

        debug!(
            "Unsubscribed handler {:?} from {}",
            subscription.id, subscription.topic
        );
        removed
    }

    /// Deliver `payload` to every handler of `topic`. Returns how many ran.
    ///
    /// Handlers are invoked after the registry lock is released, so a
    /// handler may subscribe or unsubscribe without deadlocking.
    pub fn dispatch(&self, topic: &str, payload: &Value) -> usize {
        let targets: Vec<EventHandler> = match self.handlers().get(topic) {
            Some(list) => list.iter().map(|(_, handler)| handler.clone()).collect(),
            None => {
                trace!("No handlers for {}", topic);
                return 0;
            }
        };

        for handler in &targets {
            handler(payload);
        }
        targets.len()
    }

    pub fn handler_count(&self, topic: &str) -> usize {
        self.handlers().get(topic).map_or(0, Vec::len)
    }

    /// Total handlers across all topics.
    pub fn total_handlers(&self) -> usize {
        self.handlers().values().map(Vec::len).sum()
    }
}
