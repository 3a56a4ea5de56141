//! Node event stream to broadcast hub.

use super::classify::classify;
use super::sanitize::Sanitizer;
use crate::hub::{BroadcastHub, Topic};
use crate::middleware::GatewayMetrics;
use crate::ports::CurrentBlockSource;
use serde_json::Value;
use shared_bus::{NodeEvent, Subscription};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// Classifies node events and publishes the relevant ones.
pub struct EventAdapter {
    hub: Arc<BroadcastHub>,
    sanitizer: Arc<dyn Sanitizer>,
    metrics: Arc<GatewayMetrics>,
}

impl EventAdapter {
    pub fn new(
        hub: Arc<BroadcastHub>,
        sanitizer: Arc<dyn Sanitizer>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            hub,
            sanitizer,
            metrics,
        }
    }

    /// Route one event. Returns the topics it was published to.
    ///
    /// Unrelated or unsanitizable events are dropped; this never fails.
    pub fn on_node_event(&self, event: &NodeEvent) -> Vec<Topic> {
        let topics = classify(&event.document);
        self.metrics.record_event(!topics.is_empty());
        if topics.is_empty() {
            trace!(event_id = %event.id, "Ignoring node event");
            return topics;
        }

        topics
            .into_iter()
            .filter(|&topic| {
                let Some(message) = self.render(topic, &event.document) else {
                    return false;
                };
                let report = self.hub.publish(topic, message);
                debug!(
                    event_id = %event.id,
                    topic = %topic,
                    delivered = report.delivered,
                    dropped = report.dropped,
                    "Node event broadcast"
                );
                true
            })
            .collect()
    }

    /// Sanitize and serialize a document for `topic`
    fn render(&self, topic: Topic, document: &Value) -> Option<String> {
        let dto = match self.sanitizer.sanitize(topic, document) {
            Ok(dto) => dto,
            Err(e) => {
                self.metrics.record_unsanitizable();
                debug!(topic = %topic, error = %e, "Dropping unsanitizable document");
                return None;
            }
        };
        match serde_json::to_string(&dto) {
            Ok(message) => Some(message),
            Err(e) => {
                self.metrics.record_unsanitizable();
                warn!(topic = %topic, error = %e, "Failed to serialize document");
                None
            }
        }
    }

    /// Seed the block snapshot from stored state without broadcasting.
    pub async fn prime(&self, source: &dyn CurrentBlockSource) -> bool {
        let Some(block) = source.current_block().await else {
            debug!("No stored block to prime onboarding with");
            return false;
        };
        let Some(message) = self.render(Topic::Block, &block) else {
            return false;
        };
        let primed = self.hub.prime_snapshot(message);
        if primed {
            info!("Block snapshot primed from stored chain");
        }
        primed
    }

    /// Consume the node event stream until it closes or shutdown is signalled.
    pub async fn run(&self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        info!("Event adapter started");
        loop {
            tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => {
                        self.on_node_event(&event);
                    }
                    None => {
                        info!("Node event stream closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Event adapter shutting down");
                        break;
                    }
                }
            }
        }
    }
}
