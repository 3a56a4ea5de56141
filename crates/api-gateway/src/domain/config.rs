//! Gateway configuration with validation.

use crate::limiter::{LimiterScope, Strategy};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration (API routes and push endpoints)
    pub http: HttpConfig,
    /// Push channel configuration
    pub websocket: WebSocketConfig,
    /// Admin server configuration (localhost only by default)
    pub admin: AdminConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Node event bus configuration
    pub event_bus: EventBusConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.enabled && self.admin.enabled && self.http.port == self.admin.port {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.rate_limit.enabled {
            if self.rate_limit.strategy.limit_per_second == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "limit_per_second cannot be 0".into(),
                ));
            }
            if self.rate_limit.strategy.limit_per_minute == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "limit_per_minute cannot be 0".into(),
                ));
            }
        }

        for path in [&self.websocket.block_path, &self.websocket.peer_path] {
            if !path.starts_with('/') || path.len() < 2 {
                return Err(ConfigError::InvalidPath(path.clone()));
            }
        }
        if self.websocket.block_path == self.websocket.peer_path {
            return Err(ConfigError::InvalidPath(format!(
                "block and peer channels share {}",
                self.websocket.block_path
            )));
        }

        if self.websocket.subscriber_buffer == 0 {
            return Err(ConfigError::InvalidLimit(
                "subscriber_buffer cannot be 0".into(),
            ));
        }
        if self.websocket.write_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "write_timeout cannot be 0".into(),
            ));
        }
        if self.websocket.ping_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "ping_interval cannot be 0".into(),
            ));
        }
        if self.rate_limit.cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "cleanup_interval cannot be 0".into(),
            ));
        }
        if self.event_bus.capacity == 0 {
            return Err(ConfigError::InvalidLimit("event bus capacity cannot be 0".into()));
        }

        Ok(())
    }

    /// HTTP bind addresses (IPv4 and, when set, IPv6)
    pub fn http_addrs(&self) -> Vec<SocketAddr> {
        let mut addrs = vec![SocketAddr::new(self.http.host, self.http.port)];
        if let Some(v6) = self.http.ipv6 {
            addrs.push(SocketAddr::new(v6, self.http.port));
        }
        addrs
    }

    /// Admin server bind address
    pub fn admin_addr(&self) -> SocketAddr {
        SocketAddr::new(self.admin.host, self.admin.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Optional second listener on an IPv6 address, same port
    pub ipv6: Option<IpAddr>,
    /// Port (default: 10901)
    pub port: u16,
    /// Enable HTTP server
    pub enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            ipv6: None,
            port: 10901,
            enabled: true,
        }
    }
}

/// Push channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Path of the block channel
    pub block_path: String,
    /// Path of the peer channel
    pub peer_path: String,
    /// Messages queued per subscriber before it counts as backlogged and is dropped
    pub subscriber_buffer: usize,
    /// Longest a single frame write may take
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
    /// Server ping interval
    #[serde(with = "humantime_serde")]
    pub ping_interval: Duration,
    /// Max concurrent push connections (both channels)
    pub max_connections: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            block_path: "/ws/block".to_string(),
            peer_path: "/ws/peer".to_string(),
            subscriber_buffer: 256,
            write_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
            max_connections: 4096,
        }
    }
}

/// Admin server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bind address (localhost only by default)
    pub host: IpAddr,
    /// Port (default: 10902)
    pub port: u16,
    /// Enable admin server
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 10902,
            enabled: true,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Budget per route, or per route and client IP
    pub scope: LimiterScope,
    /// Strategy bound to every public route
    pub strategy: Strategy,
    /// IPs never limited
    pub whitelist: Vec<IpAddr>,
    /// Peers allowed to name the client through forwarded headers
    pub trusted_proxies: Vec<IpAddr>,
    /// Trust loopback peers (127.0.0.1, ::1) as proxies
    pub trust_localhost: bool,
    /// Client bindings idle this long are evicted
    #[serde(with = "humantime_serde")]
    pub idle_binding_ttl: Duration,
    /// How often idle client bindings are swept
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: LimiterScope::Route,
            strategy: Strategy::HIGH_USAGE,
            whitelist: Vec::new(),
            trusted_proxies: Vec::new(),
            trust_localhost: true,
            idle_binding_ttl: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Whether a direct peer may set `X-Forwarded-For` / `X-Real-IP`
    pub fn is_trusted_proxy(&self, ip: IpAddr) -> bool {
        self.trusted_proxies.contains(&ip) || (self.trust_localhost && ip.is_loopback())
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache (seconds)
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string()],
            max_age: 86400,
        }
    }
}

/// Node event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Events buffered before a slow consumer starts lagging
    pub capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// HTTP and admin servers on the same port
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid push channel path
    #[error("invalid push path: {0}")]
    InvalidPath(String),
}
