//! Storm Watch dashboard server.
//!
//! Wires the strike store, the simulated lightning feed and the HTTP API
//! together and runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`STORMWATCH_CONFIG`, default
//!    `stormwatch-config.yaml`; defaults when absent)
//! 2. Initialize structured logging (tracing)
//! 3. Create the strike store
//! 4. Build provider clients
//! 5. Spawn the lightning simulator
//! 6. Serve the HTTP API until `Ctrl-C`
//! 7. Stop the simulator

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use stormwatch_api::{AppState, ServerConfig};
use stormwatch_core::config::{LoggingConfig, DEFAULT_CONFIG_PATH};
use stormwatch_core::{DashboardConfig, LightningSimulator};
use stormwatch_providers::{GeocodingClient, WeatherClient};
use stormwatch_store::EventStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerBinError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the listener cannot
/// bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path();
    let config = DashboardConfig::load_or_default(&config_path).map_err(ServerBinError::from)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        path = %config_path.display(),
        host = config.server.host,
        port = config.server.port,
        simulation = config.simulation.enabled,
        "stormwatch-server starting"
    );

    // 3. Create the strike store.
    let store = Arc::new(EventStore::with_max_records(config.store.max_records));

    // 4. Build provider clients.
    let timeout = config.providers.request_timeout();
    let geocoding = GeocodingClient::new(
        config.providers.geocoding_url.clone(),
        config.providers.geocoding_api_key.clone(),
        timeout,
    );
    let weather = WeatherClient::new(
        config.providers.weather_url.clone(),
        config.providers.weather_api_key.clone(),
        timeout,
    );
    if !geocoding.is_configured() {
        warn!("MAPBOX_API_KEY not set, city search and place labels are disabled");
    }
    if !weather.is_configured() {
        warn!("OPENWEATHERMAP_API_KEY not set, weather lookups will fail");
    }

    // 5. Spawn the lightning simulator.
    let simulator = if config.simulation.enabled {
        let simulator = LightningSimulator::new(
            Arc::clone(&store),
            geocoding.clone(),
            config.simulation.clone(),
        )
        .map_err(ServerBinError::from)?;
        Some(simulator.spawn())
    } else {
        None
    };

    // 6. Serve until Ctrl-C.
    let state = Arc::new(
        AppState::new(Arc::clone(&store), geocoding, weather)
            .with_lightning_limit(config.server.lightning_limit),
    );
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = stormwatch_api::start_server(&server_config, state, shutdown_signal()).await;

    // 7. Stop the simulator even if serving failed.
    if let Some(handle) = simulator {
        handle.shutdown().await.map_err(ServerBinError::from)?;
    }
    served.map_err(ServerBinError::from)?;

    let stats = store.stats().await;
    info!(
        stored = stats.len,
        total_inserted = stats.total_inserted,
        total_evicted = stats.total_evicted,
        "stormwatch-server shutdown complete"
    );
    Ok(())
}

/// Config file location: `STORMWATCH_CONFIG` or the default name.
fn config_path() -> PathBuf {
    std::env::var_os("STORMWATCH_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    if logging.is_json() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Resolves on `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, shutting down");
    }
    info!("shutdown signal received");
}
