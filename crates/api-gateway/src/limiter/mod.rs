//! Per-route admission control.
//!
//! Dual fixed-window counting: every binding keeps a one-second and a
//! one-minute counter aligned on wall-clock boundaries. A call is admitted
//! only when both windows have budget left; an admitted call counts against
//! both. Decisions never wait, queue or perform I/O.

pub mod binding;
pub mod registry;
pub mod strategy;

pub use binding::{LimiterBinding, WindowCounters};
pub use registry::{cleanup_task, LimiterScope, RateLimiter};
pub use strategy::{Strategy, Verdict, WindowKind};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in unix milliseconds.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
