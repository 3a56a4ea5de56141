//! Dual fixed-window counter bound to one route (or one route + client).
//!
//! Windows are aligned on wall-clock boundaries, not sliding: a caller may
//! spend a full second budget at the end of one second and another full
//! budget at the start of the next.

use super::strategy::{Strategy, Verdict, WindowKind};
use super::unix_millis;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Counter state. Both windows are always read and written together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounters {
    /// Start of the active second window (unix ms, multiple of 1000)
    pub second_window_start: u64,
    pub second_count: u32,
    /// Start of the active minute window (unix ms, multiple of 60000)
    pub minute_window_start: u64,
    pub minute_count: u32,
    /// Time of the last decision (unix ms), used for idle eviction
    pub last_decision: u64,
}

impl WindowCounters {
    /// Advance either window whose boundary has been crossed.
    ///
    /// A clock that moves backwards never reopens an older window.
    fn roll(&mut self, now_ms: u64) {
        let second_start = align(now_ms, WindowKind::Second);
        if second_start > self.second_window_start {
            self.second_window_start = second_start;
            self.second_count = 0;
        }

        let minute_start = align(now_ms, WindowKind::Minute);
        if minute_start > self.minute_window_start {
            self.minute_window_start = minute_start;
            self.minute_count = 0;
        }
    }

    fn remaining(&self, window: WindowKind, now_ms: u64) -> Duration {
        let start = match window {
            WindowKind::Second => self.second_window_start,
            WindowKind::Minute => self.minute_window_start,
        };
        Duration::from_millis((start + window.millis()).saturating_sub(now_ms))
    }
}

/// Mutable limiter state for one binding.
pub struct LimiterBinding {
    strategy: Arc<Strategy>,
    state: Mutex<WindowCounters>,
}

impl LimiterBinding {
    pub fn new(strategy: Arc<Strategy>) -> Self {
        Self {
            strategy,
            state: Mutex::new(WindowCounters::default()),
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Decide a call arriving now.
    pub fn decide(&self) -> Verdict {
        self.decide_at(unix_millis())
    }

    /// Decide a call arriving at `now_ms` (unix milliseconds).
    ///
    /// Allow increments both counters; Deny leaves them untouched.
    pub fn decide_at(&self, now_ms: u64) -> Verdict {
        let mut state = self.state.lock();
        state.roll(now_ms);
        state.last_decision = state.last_decision.max(now_ms);

        if state.second_count >= self.strategy.limit_per_second {
            return Verdict::Deny {
                window: WindowKind::Second,
                retry_after: state.remaining(WindowKind::Second, now_ms),
            };
        }
        if state.minute_count >= self.strategy.limit_per_minute {
            return Verdict::Deny {
                window: WindowKind::Minute,
                retry_after: state.remaining(WindowKind::Minute, now_ms),
            };
        }

        state.second_count += 1;
        state.minute_count += 1;
        Verdict::Allow
    }

    /// Copy of the current counters
    pub fn counters(&self) -> WindowCounters {
        *self.state.lock()
    }

    /// Milliseconds since the last decision, relative to `now_ms`
    pub fn idle_for(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.state.lock().last_decision))
    }
}

impl std::fmt::Debug for LimiterBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterBinding")
            .field("strategy", &*self.strategy)
            .field("state", &self.counters())
            .finish()
    }
}

fn align(now_ms: u64, window: WindowKind) -> u64 {
    now_ms - now_ms % window.millis()
}
