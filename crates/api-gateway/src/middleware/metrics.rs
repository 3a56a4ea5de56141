//! Gateway counters, exported as JSON by the admin server.

use crate::limiter::WindowKind;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // Admission
    pub requests_total: AtomicU64,
    pub requests_allowed: AtomicU64,
    pub denied_second: AtomicU64,
    pub denied_minute: AtomicU64,
    pub handler_errors: AtomicU64,

    // Push channels
    pub push_connections: AtomicU64,
    pub push_connections_rejected: AtomicU64,
    pub push_frames_sent: AtomicU64,

    // Node events
    pub events_received: AtomicU64,
    pub events_ignored: AtomicU64,
    pub events_unsanitizable: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted call
    pub fn record_allowed(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_allowed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a call rejected on `window`
    pub fn record_denied(&self, window: WindowKind) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        match window {
            WindowKind::Second => self.denied_second.fetch_add(1, Ordering::Relaxed),
            WindowKind::Minute => self.denied_minute.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_push_connect(&self) {
        self.push_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_push_disconnect(&self) {
        self.push_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_push_rejected(&self) {
        self.push_connections_rejected
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_push_frame(&self) {
        self.push_frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a node event; `relevant` is false when no topic matched
    pub fn record_event(&self, relevant: bool) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
        if !relevant {
            self.events_ignored.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_unsanitizable(&self) {
        self.events_unsanitizable.fetch_add(1, Ordering::Relaxed);
    }

    /// Current push connections
    pub fn push_connections(&self) -> u64 {
        self.push_connections.load(Ordering::Relaxed)
    }

    /// Export as JSON
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "allowed": self.requests_allowed.load(Ordering::Relaxed),
                "denied_second": self.denied_second.load(Ordering::Relaxed),
                "denied_minute": self.denied_minute.load(Ordering::Relaxed),
                "handler_errors": self.handler_errors.load(Ordering::Relaxed),
            },
            "push": {
                "connections": self.push_connections.load(Ordering::Relaxed),
                "rejected": self.push_connections_rejected.load(Ordering::Relaxed),
                "frames_sent": self.push_frames_sent.load(Ordering::Relaxed),
            },
            "events": {
                "received": self.events_received.load(Ordering::Relaxed),
                "ignored": self.events_ignored.load(Ordering::Relaxed),
                "unsanitizable": self.events_unsanitizable.load(Ordering::Relaxed),
            },
        })
    }
}
