//! # Gateway Test Suite
//!
//! Cross-crate flows that need a bound gateway: real HTTP admission and
//! WebSocket push fed from the node event bus.
//!
//! ```text
//! tests/
//! ├── benches/gateway_benchmarks.rs   # limiter and hub hot paths
//! └── src/integration/
//!     ├── admission.rs                # rate limiting over HTTP
//!     └── push.rs                     # bus → hub → WebSocket
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gateway-tests
//! cargo bench -p gateway-tests
//! ```

pub mod integration;
