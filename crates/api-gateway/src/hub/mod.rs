//! Broadcast hub for the `block` and `peer` push topics.

pub mod broadcast;
pub mod sink;
pub mod topic;

pub use broadcast::{
    BroadcastHub, HubStats, PublishReport, SubscribeError, SubscriptionGuard, SubscriptionHandle,
};
pub use sink::{PushMessage, PushSink, SinkError};
pub use topic::{Topic, UnknownTopic};
