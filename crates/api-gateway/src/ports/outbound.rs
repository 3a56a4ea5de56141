//! Outbound ports: what the gateway needs from the node.

use crate::domain::{ApiRequest, ApiResult};
use async_trait::async_trait;
use serde_json::Value;

/// Business logic behind the public routes.
///
/// Called only for requests the rate limiter admitted. The returned value is
/// already projected onto the route's public response shape.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: ApiRequest) -> ApiResult<Value>;
}

/// Read access to the node's latest stored block.
#[async_trait]
pub trait CurrentBlockSource: Send + Sync {
    /// Latest block, or `None` before the chain has one
    async fn current_block(&self) -> Option<Value>;
}

/// Source for a node with no stored chain yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyChain;

#[async_trait]
impl CurrentBlockSource for EmptyChain {
    async fn current_block(&self) -> Option<Value> {
        None
    }
}
