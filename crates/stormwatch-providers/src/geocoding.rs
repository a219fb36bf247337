//! Place search and reverse geocoding client.
//!
//! Speaks the Mapbox geocoding v5 wire format:
//! `GET {base}/geocoding/v5/mapbox.places/{query}.json?access_token=..&types=place`
//! where `{query}` is either free text or `"{lon},{lat}"`.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use stormwatch_types::{CitySearchResult, Coordinates};
use tracing::debug;

use crate::error::ProviderError;

/// Public Mapbox API root.
pub const DEFAULT_GEOCODING_URL: &str = "https://api.mapbox.com";

/// Maximum number of autocomplete suggestions requested.
const SEARCH_LIMIT: &str = "5";

/// Provider name used in error messages.
const PROVIDER: &str = "Mapbox";

/// Anything that can turn coordinates into a place label.
///
/// The simulated lightning feed depends on this seam rather than on the
/// HTTP client so it can run against a fake in tests.
pub trait ReverseGeocoder: Send + Sync {
    /// Look up the place containing `coordinates`.
    ///
    /// Returns `Ok(None)` when the provider has no match.
    fn reverse_geocode(
        &self,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<Option<String>, ProviderError>> + Send;
}

/// HTTP client for the geocoding provider.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

// ---------------------------------------------------------------------------
// Provider response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    place_name: String,
    /// `[lon, lat]`
    center: [f64; 2],
    #[serde(default)]
    context: Vec<ContextEntry>,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    text: String,
}

impl From<Feature> for CitySearchResult {
    fn from(feature: Feature) -> Self {
        let [lon, lat] = feature.center;
        Self {
            place_name: feature.place_name,
            coordinates: Coordinates::new(lat, lon),
            context: Some(feature.context.into_iter().map(|c| c.text).collect()),
        }
    }
}

impl GeocodingClient {
    /// Create a geocoding client.
    ///
    /// `api_key` may be `None`; every call then fails with
    /// [`ProviderError::NotConfigured`].
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout,
        }
    }

    /// Whether an API key is configured.
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search for places matching `query`, best match first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] without a key, or
    /// [`ProviderError::Upstream`] / [`ProviderError::Decode`] if the call
    /// fails.
    pub async fn search(&self, query: &str) -> Result<Vec<CitySearchResult>, ProviderError> {
        let response = self
            .places(query, &[("types", "place"), ("limit", SEARCH_LIMIT)])
            .await?;
        debug!(query, results = response.features.len(), "City search complete");
        Ok(response.features.into_iter().map(CitySearchResult::from).collect())
    }

    /// Name of the place containing `coordinates`, if any.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search).
    pub async fn reverse(&self, coordinates: Coordinates) -> Result<Option<String>, ProviderError> {
        let query = format!("{},{}", coordinates.lon, coordinates.lat);
        let response = self.places(&query, &[("types", "place")]).await?;
        Ok(response.features.into_iter().next().map(|f| f.place_name))
    }

    async fn places(
        &self,
        query: &str,
        params: &[(&str, &str)],
    ) -> Result<PlacesResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured { provider: PROVIDER })?;
        let url = self.places_url(query)?;

        let response = self
            .client
            .get(url)
            .query(&[("access_token", api_key)])
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("geocoding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ProviderError::Upstream(format!(
                "geocoding returned {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("geocoding response parse failed: {e}")))
    }

    fn places_url(&self, query: &str) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ProviderError::Upstream(format!("invalid geocoding base URL {}: {e}", self.base_url))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                ProviderError::Upstream(format!("geocoding base URL {} cannot be a base", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .push("geocoding")
                .push("v5")
                .push("mapbox.places")
                .push(&format!("{query}.json"));
        }
        Ok(url)
    }
}

impl ReverseGeocoder for GeocodingClient {
    async fn reverse_geocode(
        &self,
        coordinates: Coordinates,
    ) -> Result<Option<String>, ProviderError> {
        self.reverse(coordinates).await
    }
}
