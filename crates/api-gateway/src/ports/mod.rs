//! Ports (hexagonal boundaries) of the gateway.

pub mod outbound;

pub use outbound::{CurrentBlockSource, EmptyChain, RequestHandler};
