//! # Node Events
//!
//! The node's event stream is heterogeneous: blocks, peers, identities,
//! memberships and anything else the node decides to announce all travel
//! as JSON documents. The bus does not interpret them; consumers classify
//! documents by shape.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// A single state-change notification emitted by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    /// Unique event id (for log correlation only).
    pub id: Uuid,
    /// Emission time in unix milliseconds.
    pub emitted_at: u64,
    /// The raw document as produced by the node.
    pub document: serde_json::Value,
}

impl NodeEvent {
    /// Wrap a document emitted now.
    #[must_use]
    pub fn new(document: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            emitted_at: unix_millis(),
            document,
        }
    }
}

impl From<serde_json::Value> for NodeEvent {
    fn from(document: serde_json::Value) -> Self {
        Self::new(document)
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
