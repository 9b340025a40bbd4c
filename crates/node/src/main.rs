//! Telemetry Node - Main Entry Point

use anyhow::Context;
use node::{init_logging, install_metrics, NodeConfig, Pipeline};
use std::path::PathBuf;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = NodeConfig::load(config_path.as_deref()).context("loading configuration")?;

    init_logging(&config.logging)?;
    let metrics = install_metrics()?;

    info!("=== Telemetry Node v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: backlog {} bytes, period {} ms, auto-reconnect {}",
        config.store.capacity, config.acquisition.period_ms, config.uplink.auto_reconnect
    );
    debug!("Effective configuration: {}", serde_json::to_string(&config)?);

    let pipeline = Pipeline::start(&config).await?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Interrupt received");

    let report = pipeline.shutdown().await?;
    info!("Shutdown report: {}", serde_json::to_string(&report)?);
    info!("Metrics at exit:\n{}", metrics.render());

    Ok(())
}
