//! Vanguard Server - Headless trading agent host
//!
//! Operators connect over WebSocket and drive one trading agent per
//! session with `start` / `stop` commands.
//!
//! # Usage
//! ```sh
//! MODE=mock SERVER_BIND_ADDRESS=127.0.0.1:8080 cargo run --bin server
//! ```
//!
//! # Environment Variables
//! - `MODE` - `mock` (default) or `alpaca`
//! - `SERVER_BIND_ADDRESS` - Listen address (default: 0.0.0.0:8080)
//! - `TICK_INTERVAL_SECS` - Seconds between agent ticks (default: 60)

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;
use vanguard::application::agents::AgentFactory;
use vanguard::config::Config;
use vanguard::infrastructure::ServiceFactory;
use vanguard::interfaces::serve;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Vanguard Server {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Mode={:?}, Tick={}s, SMA {}/{}, RSI {}",
        config.mode,
        config.server.tick_interval_secs,
        config.strategy.fast_sma_period,
        config.strategy.slow_sma_period,
        config.strategy.rsi_period
    );

    let (market_data, execution) = ServiceFactory::create_services(&config);
    let factory = AgentFactory::new(
        market_data,
        execution,
        Arc::new(config.build_strategy()?),
        config.agent_settings(),
    );

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    info!("Server running. Press Ctrl+C to shutdown.");
    serve(listener, factory, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
        }
    })
    .await?;

    info!("Shutdown signal received. Exiting...");
    Ok(())
}
