//! Event shape classification.

use crate::hub::Topic;
use serde_json::Value;

/// Field whose presence marks a new block
pub const BLOCK_MARKER: &str = "joiners";
/// Field whose presence marks a new peer
pub const PEER_MARKER: &str = "endpoints";

/// Topics a node document belongs to.
///
/// A marker counts when its value is set: `null`, `false`, `0` and `""` do
/// not count, while empty arrays and objects do. The two checks are
/// independent, so a document carrying both markers goes to both topics.
/// Non-objects match nothing.
pub fn classify(document: &Value) -> Vec<Topic> {
    let Some(object) = document.as_object() else {
        return Vec::new();
    };
    let has = |field: &str| object.get(field).is_some_and(is_set);

    let mut topics = Vec::with_capacity(2);
    if has(BLOCK_MARKER) {
        topics.push(Topic::Block);
    }
    if has(PEER_MARKER) {
        topics.push(Topic::Peer);
    }
    topics
}

fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
