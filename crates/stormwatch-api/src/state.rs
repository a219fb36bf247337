//! Shared application state for the API server.

use std::sync::Arc;

use stormwatch_providers::{GeocodingClient, WeatherClient};
use stormwatch_store::EventStore;

/// Number of strikes returned by `GET /api/lightning` unless configured.
pub const DEFAULT_LIGHTNING_LIMIT: usize = 20;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// store is the same instance the lightning simulator writes to.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The strike store.
    pub store: Arc<EventStore>,
    /// Geocoding provider client.
    pub geocoding: GeocodingClient,
    /// Weather provider client.
    pub weather: WeatherClient,
    /// Number of strikes returned by the list endpoint.
    pub lightning_limit: usize,
}

impl AppState {
    /// Create application state around an existing store.
    pub const fn new(
        store: Arc<EventStore>,
        geocoding: GeocodingClient,
        weather: WeatherClient,
    ) -> Self {
        Self {
            store,
            geocoding,
            weather,
            lightning_limit: DEFAULT_LIGHTNING_LIMIT,
        }
    }

    /// Override the number of strikes returned by the list endpoint.
    #[must_use]
    pub const fn with_lightning_limit(mut self, limit: usize) -> Self {
        self.lightning_limit = limit;
        self
    }
}
