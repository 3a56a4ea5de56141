//! Event adapter: turns node state changes into push messages.
//!
//! A document with a `joiners` field is a new block, one with an `endpoints`
//! field is a new peer. Everything else on the node's event stream is
//! ignored.

pub mod classify;
pub mod event_adapter;
pub mod sanitize;

pub use classify::{classify, BLOCK_MARKER, PEER_MARKER};
pub use event_adapter::EventAdapter;
pub use sanitize::{DtoProjection, SanitizeError, Sanitizer, BLOCK_FIELDS, PEER_FIELDS};
