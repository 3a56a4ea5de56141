// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! API Gateway - admission control and realtime push in front of a ledger node.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                            API GATEWAY                                │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────┐   ┌──────────────┐                  │
//! │  │ HTTP (routes + /ws/*)        │   │    Admin     │                  │
//! │  │ Port 10901                   │   │  Port 10902  │                  │
//! │  └──────┬───────────────┬───────┘   └──────────────┘                  │
//! │         │               │                                             │
//! │  ┌──────┴──────┐  ┌─────┴─────────────┐                               │
//! │  │ RateLimiter │  │  BroadcastHub      │◄── EventAdapter ◄── Event Bus │
//! │  │ 1s + 1min   │  │  block (snapshot)  │     joiners   → block         │
//! │  │ windows     │  │  peer              │     endpoints → peer          │
//! │  └──────┬──────┘  └────────────────────┘                               │
//! │         │                                                             │
//! │  ┌──────┴───────────┐                                                 │
//! │  │  RequestHandler  │  (node business logic, outside this crate)      │
//! │  └──────────────────┘                                                 │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use api_gateway::{GatewayConfig, GatewayService};
//!
//! let service = GatewayService::new(GatewayConfig::default(), handler)?;
//! service.prime(&chain).await;
//! let handle = service.start(bus.subscribe()).await?;
//! ```
//!
//! # Push onboarding
//!
//! A new `block` subscriber receives the latest block before any live
//! message. `peer` subscribers only see peers announced after they joined.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapter;
pub mod domain;
pub mod hub;
pub mod limiter;
pub mod middleware;
pub mod ports;
pub mod service;
pub mod ws;

// Re-exports for public API
pub use adapter::{DtoProjection, EventAdapter, Sanitizer};
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use domain::routes::{find_route, ApiRequest, RouteSpec, Verb, ROUTES};
pub use hub::{BroadcastHub, PushSink, Topic};
pub use limiter::{RateLimiter, Strategy, Verdict, WindowKind};
pub use middleware::GatewayMetrics;
pub use ports::{CurrentBlockSource, EmptyChain, RequestHandler};
pub use service::{GatewayHandle, GatewayService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
