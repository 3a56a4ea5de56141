//! Subscriber output sinks.

use std::sync::Arc;
use tokio::sync::mpsc;

/// Serialized message, shared by every subscriber it is delivered to.
pub type PushMessage = Arc<str>;

/// Why a sink refused a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The subscriber is not keeping up
    #[error("subscriber backlog is full")]
    Backlogged,
    /// The subscriber has gone away
    #[error("subscriber disconnected")]
    Disconnected,
}

/// Non-blocking output for one subscriber.
///
/// `try_push` must return immediately; any failure removes the subscriber
/// from its topic.
pub trait PushSink: Send + Sync {
    fn try_push(&self, message: PushMessage) -> Result<(), SinkError>;
}

impl PushSink for mpsc::Sender<PushMessage> {
    fn try_push(&self, message: PushMessage) -> Result<(), SinkError> {
        self.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Backlogged,
            mpsc::error::TrySendError::Closed(_) => SinkError::Disconnected,
        })
    }
}

impl PushSink for mpsc::UnboundedSender<PushMessage> {
    fn try_push(&self, message: PushMessage) -> Result<(), SinkError> {
        self.send(message).map_err(|_| SinkError::Disconnected)
    }
}
