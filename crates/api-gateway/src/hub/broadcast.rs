//! Topic-scoped fan-out with block onboarding.
//!
//! Each topic is guarded by its own mutex. Subscribing (including the
//! onboarding send) and publishing (including the snapshot update and every
//! per-subscriber send) each happen inside one critical section, so:
//!
//! - a new block subscriber sees the snapshot before any live update,
//! - all subscribers of a topic see publishes in the same order,
//! - a failed subscriber is gone before the next publish starts.
//!
//! Sends never block: sinks are non-blocking and a sink that refuses a
//! message is dropped from its topic.

use super::sink::{PushMessage, PushSink, SinkError};
use super::topic::Topic;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub topic: Topic,
    pub id: u64,
}

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the message
    pub delivered: usize,
    /// Subscribers removed because their send failed
    pub dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubscribeError {
    /// The snapshot could not be handed to the new subscriber
    #[error("onboarding message could not be delivered: {0}")]
    OnboardingFailed(SinkError),
}

/// Hub counters
#[derive(Debug, Default)]
pub struct HubStats {
    pub published: AtomicU64,
    pub delivered: AtomicU64,
    pub dropped_subscribers: AtomicU64,
    pub onboarded: AtomicU64,
}

impl HubStats {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "published": self.published.load(Ordering::Relaxed),
            "delivered": self.delivered.load(Ordering::Relaxed),
            "dropped_subscribers": self.dropped_subscribers.load(Ordering::Relaxed),
            "onboarded": self.onboarded.load(Ordering::Relaxed),
        })
    }
}

#[derive(Default)]
struct TopicState {
    subscribers: BTreeMap<u64, Box<dyn PushSink>>,
    /// Latest message, block topic only
    snapshot: Option<PushMessage>,
}

/// Process-wide subscriber registry and fan-out for every topic.
pub struct BroadcastHub {
    block: Mutex<TopicState>,
    peer: Mutex<TopicState>,
    next_id: AtomicU64,
    stats: HubStats,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            block: Mutex::new(TopicState::default()),
            peer: Mutex::new(TopicState::default()),
            next_id: AtomicU64::new(1),
            stats: HubStats::default(),
        }
    }

    fn state(&self, topic: Topic) -> &Mutex<TopicState> {
        match topic {
            Topic::Block => &self.block,
            Topic::Peer => &self.peer,
        }
    }

    /// Register `sink` under `topic`.
    ///
    /// On the block topic the current snapshot, if any, is pushed to the sink
    /// before it becomes visible to publishers. If that push fails the sink is
    /// not registered.
    pub fn subscribe(
        &self,
        topic: Topic,
        sink: impl PushSink + 'static,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        let mut state = self.state(topic).lock();

        if let Some(snapshot) = &state.snapshot {
            sink.try_push(Arc::clone(snapshot))
                .map_err(SubscribeError::OnboardingFailed)?;
            self.stats.onboarded.fetch_add(1, Ordering::Relaxed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        state.subscribers.insert(id, Box::new(sink));
        debug!(
            topic = %topic,
            id,
            subscribers = state.subscribers.len(),
            "Subscriber added"
        );

        Ok(SubscriptionHandle { topic, id })
    }

    /// Subscribe and get a guard that unsubscribes when dropped.
    pub fn subscribe_guarded(
        self: &Arc<Self>,
        topic: Topic,
        sink: impl PushSink + 'static,
    ) -> Result<SubscriptionGuard, SubscribeError> {
        let handle = self.subscribe(topic, sink)?;
        Ok(SubscriptionGuard {
            hub: Arc::clone(self),
            handle,
        })
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let removed = self
            .state(handle.topic)
            .lock()
            .subscribers
            .remove(&handle.id)
            .is_some();
        if removed {
            debug!(topic = %handle.topic, id = handle.id, "Subscriber removed");
        }
        removed
    }

    /// Send `message` to every subscriber of `topic`.
    ///
    /// On the block topic the snapshot is replaced first. Subscribers whose
    /// sink refuses the message are removed; the others are unaffected.
    pub fn publish(&self, topic: Topic, message: impl Into<PushMessage>) -> PublishReport {
        let message: PushMessage = message.into();
        let mut state = self.state(topic).lock();

        if topic.keeps_snapshot() {
            state.snapshot = Some(Arc::clone(&message));
        }

        let mut report = PublishReport::default();
        state.subscribers.retain(|id, sink| {
            match sink.try_push(Arc::clone(&message)) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    warn!(topic = %topic, id = *id, error = %e, "Dropping subscriber");
                    report.dropped += 1;
                    false
                }
            }
        });
        drop(state);

        self.stats.published.fetch_add(1, Ordering::Relaxed);
        self.stats
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .dropped_subscribers
            .fetch_add(report.dropped as u64, Ordering::Relaxed);

        debug!(
            topic = %topic,
            delivered = report.delivered,
            dropped = report.dropped,
            "Published"
        );
        report
    }

    /// Seed the block snapshot without broadcasting it.
    ///
    /// Ignored once a block has been published: a live block always wins
    /// over a stored one.
    pub fn prime_snapshot(&self, message: impl Into<PushMessage>) -> bool {
        let mut state = self.block.lock();
        if state.snapshot.is_some() {
            return false;
        }
        state.snapshot = Some(message.into());
        true
    }

    /// Latest block snapshot
    pub fn snapshot(&self) -> Option<PushMessage> {
        self.block.lock().snapshot.clone()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.state(topic).lock().subscribers.len()
    }

    pub fn stats(&self) -> &HubStats {
        &self.stats
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("block_subscribers", &self.subscriber_count(Topic::Block))
            .field("peer_subscribers", &self.subscriber_count(Topic::Peer))
            .field("has_snapshot", &self.snapshot().is_some())
            .finish()
    }
}

/// Unsubscribes when dropped.
pub struct SubscriptionGuard {
    hub: Arc<BroadcastHub>,
    handle: SubscriptionHandle,
}

impl SubscriptionGuard {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.handle);
    }
}
