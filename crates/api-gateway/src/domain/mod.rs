//! Domain types for the gateway: configuration, errors and the route table.

pub mod config;
pub mod error;
pub mod routes;

pub use config::{ConfigError, GatewayConfig, RateLimitConfig};
pub use error::{ApiError, ApiResult, GatewayError};
pub use routes::{find_route, ApiRequest, RouteSpec, Verb, ROUTES};
