//! In-memory stand-in for the node's request handlers.
//!
//! Keeps submitted blocks and peers in memory and announces them on the
//! event bus, so the push channels can be exercised without a full node.
//! Routes it does not serve answer `UNAVAILABLE`.

use api_gateway::{ApiError, ApiRequest, ApiResult, CurrentBlockSource, RequestHandler};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use shared_bus::{EventPublisher, NodeEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Blocks and peers accepted so far
pub struct MemoryNode {
    bus: Arc<dyn EventPublisher>,
    blocks: RwLock<BTreeMap<u64, Value>>,
    peers: RwLock<Vec<Value>>,
}

impl MemoryNode {
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            bus,
            blocks: RwLock::new(BTreeMap::new()),
            peers: RwLock::new(Vec::new()),
        }
    }

    /// Highest block accepted so far
    pub fn current(&self) -> Option<Value> {
        self.blocks.read().values().next_back().cloned()
    }

    async fn submit_block(&self, body: Option<Value>) -> ApiResult<Value> {
        let block = body.ok_or_else(|| ApiError::invalid_params("missing block document"))?;
        let number = block
            .get("number")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::invalid_params("block requires a numeric `number`"))?;
        if block.get("joiners").map_or(true, Value::is_null) {
            return Err(ApiError::invalid_params("block requires `joiners`"));
        }

        self.blocks.write().insert(number, block.clone());
        info!(number, "Block accepted");
        self.bus.publish(NodeEvent::new(block.clone())).await;
        Ok(block)
    }

    async fn submit_peer(&self, body: Option<Value>) -> ApiResult<Value> {
        let peer = body.ok_or_else(|| ApiError::invalid_params("missing peer document"))?;
        if !peer.get("endpoints").is_some_and(Value::is_array) {
            return Err(ApiError::invalid_params("peer requires an `endpoints` list"));
        }

        self.peers.write().push(peer.clone());
        info!(pubkey = ?peer.get("pubkey"), "Peer accepted");
        self.bus.publish(NodeEvent::new(peer.clone())).await;
        Ok(peer)
    }

    fn block(&self, request: &ApiRequest) -> ApiResult<Value> {
        let number: u64 = request
            .param("number")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ApiError::invalid_params("block number must be an integer"))?;
        self.blocks
            .read()
            .get(&number)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("block #{number}")))
    }
}

#[async_trait]
impl RequestHandler for MemoryNode {
    async fn handle(&self, request: ApiRequest) -> ApiResult<Value> {
        match request.route {
            "node_summary" => Ok(json!({
                "software": "gateway-runtime",
                "version": api_gateway::VERSION,
            })),
            "blockchain_current" => self
                .current()
                .ok_or_else(|| ApiError::not_found("no current block")),
            "blockchain_block" => self.block(&request),
            "blockchain_block_submit" => self.submit_block(request.body).await,
            "network_peers" => Ok(json!({ "peers": *self.peers.read() })),
            "network_peering_peers_submit" => self.submit_peer(request.body).await,
            route => Err(ApiError::unavailable(format!(
                "{route} is not served by this node"
            ))),
        }
    }
}

#[async_trait]
impl CurrentBlockSource for MemoryNode {
    async fn current_block(&self) -> Option<Value> {
        self.current()
    }
}
