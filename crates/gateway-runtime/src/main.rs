//! Gateway binary: serves the node API and push channels until Ctrl+C.

use anyhow::{Context, Result};
use gateway_runtime::{init_logging, load_config, GatewayRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = load_config()?;
    let runtime = GatewayRuntime::new(config)?;
    let handle = runtime.start().await?;

    info!("Gateway is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    info!("Initiating graceful shutdown...");
    handle.shutdown();
    handle.wait().await;

    Ok(())
}
