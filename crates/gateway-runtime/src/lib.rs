//! # Gateway Runtime
//!
//! Composition root for the gateway binary: logging, configuration, the node
//! event bus and the gateway service.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (file from `GATEWAY_CONFIG`, then env overrides)
//! 3. Create the event bus and the node handlers
//! 4. Prime block onboarding from the stored chain
//! 5. Bind listeners and serve until Ctrl+C

pub mod config;
pub mod node;

use anyhow::{Context, Result};
use api_gateway::{GatewayConfig, GatewayHandle, GatewayService};
use shared_bus::InMemoryEventBus;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub use config::{load_config, load_config_with, read_config_file};
pub use node::MemoryNode;

/// Install the global `tracing` subscriber.
pub fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

/// Event bus, node handlers and gateway, wired together.
pub struct GatewayRuntime {
    bus: Arc<InMemoryEventBus>,
    node: Arc<MemoryNode>,
    service: GatewayService,
}

impl GatewayRuntime {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let bus = Arc::new(InMemoryEventBus::with_capacity(config.event_bus.capacity));
        let node = Arc::new(MemoryNode::new(bus.clone()));
        let service = GatewayService::new(config, node.clone())
            .context("Failed to create gateway service")?;

        Ok(Self { bus, node, service })
    }

    /// Prime onboarding, subscribe to the bus and start serving.
    pub async fn start(&self) -> Result<GatewayHandle> {
        if !self.service.prime(self.node.as_ref()).await {
            info!("No stored block yet, block onboarding starts empty");
        }

        let handle = self
            .service
            .start(self.bus.subscribe())
            .await
            .context("Failed to start gateway")?;

        for addr in handle.http_addrs() {
            info!("HTTP: {addr}");
        }
        if let Some(addr) = handle.admin_addr() {
            info!("Admin: {addr}");
        }
        Ok(handle)
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    pub fn node(&self) -> Arc<MemoryNode> {
        Arc::clone(&self.node)
    }

    pub fn service(&self) -> &GatewayService {
        &self.service
    }
}
