//! serial2mqtt - MySensors serial gateway to MQTT bridge.
//!
//! Reads lines from the serial gateway and publishes them to MQTT, and writes
//! messages received on the subscribed topic tree back to the gateway.

use anyhow::{Context, Result};
use serial2mqtt_bridge::{Bridge, BridgeArgs, BridgeConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse();

    let config = BridgeConfig::from_args(&args).context("Invalid configuration")?;

    serial2mqtt_common::init_tracing(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting serial2mqtt");
    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    let mut bridge = Bridge::new(config);
    bridge.start().await.context("Failed to start bridge")?;

    info!("Bridge running. Press Ctrl+C to stop.");

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Received shutdown signal");
            Ok(())
        }
        Some(e) = bridge.wait_fatal() => Err(e),
    };

    bridge.stop().await;

    outcome.context("Bridge terminated")?;

    info!("Goodbye!");
    Ok(())
}
