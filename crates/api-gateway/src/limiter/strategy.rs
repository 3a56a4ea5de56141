//! Rate limit strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Immutable rate limit configuration shared by every route bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strategy {
    /// Calls admitted per wall-clock second
    pub limit_per_second: u32,
    /// Calls admitted per wall-clock minute
    pub limit_per_minute: u32,
}

impl Strategy {
    /// Strategy applied to every public endpoint by default.
    pub const HIGH_USAGE: Strategy = Strategy {
        limit_per_second: 10,
        limit_per_minute: 300,
    };

    pub const fn new(limit_per_second: u32, limit_per_minute: u32) -> Self {
        Self {
            limit_per_second,
            limit_per_minute,
        }
    }

    /// Limit for a given window kind
    pub fn limit(&self, window: WindowKind) -> u32 {
        match window {
            WindowKind::Second => self.limit_per_second,
            WindowKind::Minute => self.limit_per_minute,
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::HIGH_USAGE
    }
}

/// The two independent windows a binding counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Second,
    Minute,
}

impl WindowKind {
    pub const fn duration(self) -> Duration {
        match self {
            WindowKind::Second => Duration::from_secs(1),
            WindowKind::Minute => Duration::from_secs(60),
        }
    }

    pub(crate) const fn millis(self) -> u64 {
        match self {
            WindowKind::Second => 1_000,
            WindowKind::Minute => 60_000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WindowKind::Second => "second",
            WindowKind::Minute => "minute",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admission decision for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Rejected; nothing was counted.
    Deny {
        /// Window whose cap was reached
        window: WindowKind,
        /// Time until that window rolls over
        retry_after: Duration,
    },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// Violated window, if denied
    pub fn violated_window(&self) -> Option<WindowKind> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny { window, .. } => Some(*window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_usage_values() {
        assert_eq!(Strategy::HIGH_USAGE.limit_per_second, 10);
        assert_eq!(Strategy::HIGH_USAGE.limit_per_minute, 300);
        assert_eq!(Strategy::default(), Strategy::HIGH_USAGE);
    }

    #[test]
    fn test_window_durations() {
        assert_eq!(WindowKind::Second.duration(), Duration::from_secs(1));
        assert_eq!(WindowKind::Minute.duration(), Duration::from_secs(60));
        assert_eq!(
            WindowKind::Minute.millis() as u128,
            WindowKind::Minute.duration().as_millis()
        );
    }

    #[test]
    fn test_strategy_deserializes_from_config() {
        let strategy: Strategy =
            serde_json::from_str(r#"{"limit_per_second": 2, "limit_per_minute": 5}"#).unwrap();
        assert_eq!(strategy, Strategy::new(2, 5));
        assert_eq!(strategy.limit(WindowKind::Second), 2);
        assert_eq!(strategy.limit(WindowKind::Minute), 5);
    }

    #[test]
    fn test_verdict_helpers() {
        let deny = Verdict::Deny {
            window: WindowKind::Minute,
            retry_after: Duration::from_millis(10),
        };
        assert!(!deny.is_allowed());
        assert_eq!(deny.violated_window(), Some(WindowKind::Minute));
        assert!(Verdict::Allow.is_allowed());
        assert_eq!(Verdict::Allow.violated_window(), None);
    }
}
