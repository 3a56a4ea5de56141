//! Middleware stack for the public server.
//!
//! Order (outermost first):
//! 1. Tracing - request span
//! 2. CORS - cross-origin headers and preflight
//! 3. Rate limiting - per route, applied on each route individually

pub mod cors;
pub mod metrics;
pub mod rate_limit;
pub mod tracing;

pub use cors::create_cors_layer;
pub use metrics::GatewayMetrics;
pub use rate_limit::{extract_client_ip, RateLimitLayer, RateLimitService};
pub use self::tracing::{TracingLayer, TracingService};
