//! WebSocket push endpoints for the `block` and `peer` topics.

pub mod handler;
pub mod slots;

pub use handler::{push_router, PushConnection, PushState};
pub use slots::{ConnectionSlot, ConnectionSlots};
