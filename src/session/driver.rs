//! Mount-guarded driver for a live session view.
//!
//! Mounting binds the session channels, spawns one task that fetches the
//! snapshot and folds events strictly one at a time, and publishes the view
//! model through a `watch` channel. Unmounting cancels the liveness token;
//! every mutation checks it first, so a snapshot or event that lands after
//! teardown is discarded.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{decode, SessionChannel};
use super::live::LiveSession;
use super::status::{SessionEffect, SessionPolicy, TerminalNotice};
use super::subscription::{ChannelSet, ChannelSubscriptionManager};
use super::types::{MeetingSessionId, SessionSnapshot};
use super::view::SessionViewModel;
use crate::api::{ApiError, ApiResult, BackendClient};
use crate::transport::PushHub;

/// Where the one-shot session snapshot comes from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self, id: &MeetingSessionId) -> ApiResult<SessionSnapshot>;
}

#[async_trait]
impl SnapshotSource for BackendClient {
    async fn fetch_snapshot(&self, id: &MeetingSessionId) -> ApiResult<SessionSnapshot> {
        self.meeting_snapshot(id).await
    }
}

/// Conditions the presentation layer has to surface to the user.
#[derive(Debug)]
pub enum SessionNotice {
    Terminal(TerminalNotice),
    SnapshotFailed(ApiError),
}

pub struct SessionView {
    id: MeetingSessionId,
    hub: PushHub,
    source: Arc<dyn SnapshotSource>,
    policy: SessionPolicy,
    liveness: CancellationToken,
    view_rx: watch::Receiver<SessionViewModel>,
    task: Option<JoinHandle<()>>,
}

impl SessionView {
    /// Mount a view for `id`. Must be called from within a Tokio runtime.
    ///
    /// Channels are bound before this returns, so no event published after
    /// mount is missed; events that precede the snapshot are dropped.
    pub fn mount(
        id: MeetingSessionId,
        hub: PushHub,
        source: Arc<dyn SnapshotSource>,
        policy: SessionPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let liveness = CancellationToken::new();
        let (view_tx, view_rx) = watch::channel(SessionViewModel::loading(id.clone()));
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<(SessionChannel, Value)>();

        let mut subscriptions = ChannelSubscriptionManager::new(hub.clone());
        subscriptions.bind(Some(&id), move |channel, payload| {
            // A closed queue means the driver already stopped.
            let _ = event_tx.send((channel, payload.clone()));
        });

        let driver = SessionDriver {
            session: LiveSession::new(id.clone(), policy),
            source: source.clone(),
            subscriptions,
            events: event_rx,
            view_tx,
            notices: notice_tx,
            liveness: liveness.clone(),
        };
        let task = tokio::spawn(driver.run());

        info!("Mounted session view for {}", id);

        (
            Self {
                id,
                hub,
                source,
                policy,
                liveness,
                view_rx,
                task: Some(task),
            },
            notice_rx,
        )
    }

    pub fn id(&self) -> &MeetingSessionId {
        &self.id
    }

    /// Current view model.
    pub fn view(&self) -> SessionViewModel {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified on every view model change.
    pub fn watch(&self) -> watch::Receiver<SessionViewModel> {
        self.view_rx.clone()
    }

    pub fn is_mounted(&self) -> bool {
        !self.liveness.is_cancelled()
    }

    /// Tear down and wait until every channel handler is released.
    pub async fn unmount(mut self) {
        self.teardown().await;
    }

    /// Switch to another session. The old id is fully unsubscribed before
    /// the new one is bound.
    pub async fn remount(
        mut self,
        id: MeetingSessionId,
    ) -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        self.teardown().await;
        Self::mount(id, self.hub.clone(), self.source.clone(), self.policy)
    }

    async fn teardown(&mut self) {
        self.liveness.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Session driver for {} ended abnormally: {}", self.id, e);
            }
        }
        info!("Unmounted session view for {}", self.id);
    }
}

impl Drop for SessionView {
    fn drop(&mut self) {
        self.liveness.cancel();
    }
}

struct SessionDriver {
    session: LiveSession,
    source: Arc<dyn SnapshotSource>,
    subscriptions: ChannelSubscriptionManager<SessionChannel>,
    events: mpsc::UnboundedReceiver<(SessionChannel, Value)>,
    view_tx: watch::Sender<SessionViewModel>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    liveness: CancellationToken,
}

impl SessionDriver {
    async fn run(mut self) {
        let source = self.source.clone();
        let id = self.session.id().clone();
        let fetch = async move { source.fetch_snapshot(&id).await };
        tokio::pin!(fetch);
        let mut snapshot_pending = true;

        loop {
            tokio::select! {
                biased;
                _ = self.liveness.cancelled() => break,
                result = &mut fetch, if snapshot_pending => {
                    snapshot_pending = false;
                    self.on_snapshot(result);
                }
                received = self.events.recv() => match received {
                    Some((channel, payload)) => self.on_event(channel, &payload),
                    None => break,
                },
            }
        }

        self.subscriptions.release_all();
        debug!("Session driver for {} stopped", self.session.id());
    }

    fn on_snapshot(&mut self, result: ApiResult<SessionSnapshot>) {
        if self.liveness.is_cancelled() {
            debug!("Discarding snapshot for unmounted session {}", self.session.id());
            return;
        }

        match result {
            Ok(snapshot) => {
                let effects = self.session.apply_snapshot(snapshot);
                self.publish();
                self.carry_out(effects);
            }
            Err(e) => {
                warn!("Snapshot for {} failed: {}", self.session.id(), e);
                let _ = self.notices.send(SessionNotice::SnapshotFailed(e));
            }
        }
    }

    fn on_event(&mut self, channel: SessionChannel, payload: &Value) {
        if self.liveness.is_cancelled() {
            return;
        }

        let event = match decode(channel, payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    "Dropping malformed push on {}: {}",
                    channel.topic(self.session.id()),
                    e
                );
                return;
            }
        };

        let effects = self.session.apply(event);
        self.publish();
        self.carry_out(effects);
    }

    fn publish(&self) {
        let next = self.session.view();
        self.view_tx.send_if_modified(move |current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn carry_out(&mut self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::Terminal(notice) => {
                    info!("Session {}: {}", self.session.id(), notice.message());
                    let _ = self.notices.send(SessionNotice::Terminal(notice));
                }
                SessionEffect::Release(channel) => {
                    self.subscriptions.release(channel);
                }
            }
        }
    }
}
