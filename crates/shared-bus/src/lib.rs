//! # Shared Bus - Node Event Stream
//!
//! The node publishes every internal state change here; the gateway is one
//! consumer among several.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Node core   │                    │   Gateway    │
//! │              │    publish()       │ EventAdapter │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │  (broadcast) │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Publishing never waits on consumers. A consumer that falls more than
//! `capacity` events behind loses the oldest ones and is told how many.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::NodeEvent;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the slowest one starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
