//! Route-level limiter registry.
//!
//! Each registered route owns one binding. With client scope enabled every
//! (route, client IP) pair gets its own binding, created on first use and
//! evicted after it has been idle long enough.

use super::binding::LimiterBinding;
use super::strategy::{Strategy, Verdict};
use super::unix_millis;
use crate::domain::config::RateLimitConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What a binding is keyed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterScope {
    /// One budget per route, shared by every caller
    #[default]
    Route,
    /// One budget per route and client IP
    RouteAndClient,
}

struct RouteEntry {
    strategy: Arc<Strategy>,
    binding: Arc<LimiterBinding>,
    clients: DashMap<IpAddr, Arc<LimiterBinding>>,
}

/// Limiter state shared across requests
pub struct RateLimiter {
    config: RateLimitConfig,
    default_strategy: Arc<Strategy>,
    routes: DashMap<String, RouteEntry>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let default_strategy = Arc::new(config.strategy);
        Self {
            config,
            default_strategy,
            routes: DashMap::new(),
        }
    }

    /// Strategy instance shared by every route registered without an override
    pub fn default_strategy(&self) -> Arc<Strategy> {
        Arc::clone(&self.default_strategy)
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn scope(&self) -> LimiterScope {
        self.config.scope
    }

    /// Bind a route to a strategy. Re-registering replaces the binding.
    pub fn register(&self, route: impl Into<String>, strategy: Arc<Strategy>) {
        let route = route.into();
        debug!(
            route = %route,
            per_second = strategy.limit_per_second,
            per_minute = strategy.limit_per_minute,
            "Registering rate limit binding"
        );
        self.routes.insert(
            route,
            RouteEntry {
                binding: Arc::new(LimiterBinding::new(Arc::clone(&strategy))),
                strategy,
                clients: DashMap::new(),
            },
        );
    }

    /// Decide a call on `route` from `client`, now.
    pub fn decide(&self, route: &str, client: Option<IpAddr>) -> Verdict {
        self.decide_at(route, client, unix_millis())
    }

    /// Decide a call on `route` from `client` arriving at `now_ms`.
    pub fn decide_at(&self, route: &str, client: Option<IpAddr>, now_ms: u64) -> Verdict {
        if !self.config.enabled {
            return Verdict::Allow;
        }

        if let Some(ip) = client {
            if self.config.whitelist.contains(&ip) {
                return Verdict::Allow;
            }
        }

        let Some(entry) = self.routes.get(route) else {
            debug!(route = %route, "No rate limit binding for route");
            return Verdict::Allow;
        };

        let binding = match (self.config.scope, client) {
            (LimiterScope::RouteAndClient, Some(ip)) => {
                let slot = entry.clients.entry(ip).or_insert_with(|| {
                    debug!(route = %route, ip = %ip, "Creating client rate limit binding");
                    Arc::new(LimiterBinding::new(Arc::clone(&entry.strategy)))
                });
                Arc::clone(slot.value())
            }
            _ => Arc::clone(&entry.binding),
        };
        drop(entry);

        binding.decide_at(now_ms)
    }

    /// Route-wide binding, if registered
    pub fn binding(&self, route: &str) -> Option<Arc<LimiterBinding>> {
        self.routes.get(route).map(|e| Arc::clone(&e.binding))
    }

    /// Client binding for a route, if one has been created
    pub fn client_binding(&self, route: &str, ip: IpAddr) -> Option<Arc<LimiterBinding>> {
        self.routes
            .get(route)
            .and_then(|e| e.clients.get(&ip).map(|b| Arc::clone(b.value())))
    }

    /// Evict client bindings idle for longer than `max_age`. Route bindings are kept.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        self.cleanup_at(unix_millis(), max_age)
    }

    pub fn cleanup_at(&self, now_ms: u64, max_age: Duration) -> usize {
        let mut removed = 0;
        for entry in self.routes.iter() {
            entry.clients.retain(|ip, binding| {
                let idle = binding.idle_for(now_ms);
                if idle > max_age {
                    debug!(
                        route = %entry.key(),
                        ip = %ip,
                        idle_secs = idle.as_secs(),
                        "Removing stale client rate limit binding"
                    );
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        removed
    }

    /// Number of registered routes
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Number of live client bindings across all routes
    pub fn client_binding_count(&self) -> usize {
        self.routes.iter().map(|e| e.clients.len()).sum()
    }
}

/// Background task to evict idle client bindings
pub async fn cleanup_task(limiter: Arc<RateLimiter>, interval: Duration, max_age: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = limiter.cleanup(max_age);
        if removed > 0 {
            debug!(removed, "Rate limit cleanup pass");
        }
    }
}
