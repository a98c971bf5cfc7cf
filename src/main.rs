//! amp-bridge - HTTP and MQTT control bridge for the amplifier.

use std::sync::Arc;

use amp_bridge::config::Config;
use amp_bridge::http::{self, HttpState};
use amp_bridge::mqtt::MqttBridge;
use amp_bridge::{Amplifier, ChannelPublisher, CommandProcessor};
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Snapshots buffered for slow state consumers
const STATE_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting amp-bridge");

    let amplifier = Arc::new(Amplifier::new(config.amplifier.address.clone()));
    info!(url = amplifier.url(), "Amplifier endpoint");

    let publisher = Arc::new(ChannelPublisher::new(STATE_CHANNEL_CAPACITY));
    let processor = Arc::new(CommandProcessor::new(amplifier.clone(), publisher.clone()));

    match &config.mqtt {
        Some(mqtt) => {
            info!(host = %mqtt.host, port = mqtt.port, topic = %mqtt.topic, "MQTT enabled");
            let bridge = MqttBridge::new(mqtt, processor.clone());
            tokio::spawn(bridge.run(publisher.subscribe()));
        }
        None => info!("MQTT_HOST not set, MQTT disabled"),
    }

    let listener = TcpListener::bind((config.http.host.as_str(), config.http.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.http.host, config.http.port))?;
    let state = HttpState::new(processor, amplifier.address());

    tokio::select! {
        result = http::serve(listener, state) => result.context("HTTP server failed")?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
