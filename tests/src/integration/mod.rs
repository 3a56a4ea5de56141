//! Integration flows and the fixtures they share.

pub mod admission;
pub mod push;

use api_gateway::{
    ApiRequest, ApiResult, CurrentBlockSource, GatewayConfig, GatewayHandle, GatewayService,
    RequestHandler,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use shared_bus::InMemoryEventBus;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Answers every route with its own name
pub struct NameEcho;

#[async_trait]
impl RequestHandler for NameEcho {
    async fn handle(&self, request: ApiRequest) -> ApiResult<Value> {
        Ok(json!({ "route": request.route }))
    }
}

/// Chain whose current block is fixed
pub struct FixedChain(pub Option<Value>);

#[async_trait]
impl CurrentBlockSource for FixedChain {
    async fn current_block(&self) -> Option<Value> {
        self.0.clone()
    }
}

/// Loopback configuration on ephemeral ports, admin disabled
pub fn loopback_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.http.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.http.port = 0;
    config.admin.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.admin.port = 0;
    config.admin.enabled = false;
    config
}

/// A started gateway plus the bus feeding it
pub struct RunningGateway {
    pub service: GatewayService,
    pub bus: Arc<InMemoryEventBus>,
    pub handle: GatewayHandle,
}

impl RunningGateway {
    pub async fn start(config: GatewayConfig, chain: FixedChain) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = GatewayService::new(config, Arc::new(NameEcho))
            .unwrap_or_else(|e| panic!("gateway config rejected: {e}"));
        service.prime(&chain).await;
        let handle = service
            .start(bus.subscribe())
            .await
            .unwrap_or_else(|e| panic!("gateway failed to start: {e}"));
        Self {
            service,
            bus,
            handle,
        }
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.handle.http_addrs()[0]
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.http_addr(), path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.http_addr(), path)
    }
}
