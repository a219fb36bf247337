//! Calls the poller makes against the dashboard server.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use stormwatch_types::{
    CitySearchResult, Coordinates, NewStrike, ReverseGeocodeResult, StrikeRecord, WeatherSnapshot,
};
use tracing::debug;

use crate::error::ClientError;

/// City searches shorter than this are answered locally with no results.
pub const MIN_SEARCH_LEN: usize = 2;

/// Whether `query` is long enough to send to the search endpoint.
pub fn is_searchable(query: &str) -> bool {
    query.chars().count() >= MIN_SEARCH_LEN
}

/// The reads the dashboard makes.
///
/// Implemented over HTTP by [`HttpDashboardApi`]; tests supply fakes.
pub trait DashboardApi: Send + Sync + 'static {
    /// The most recent strikes, newest first.
    fn recent_strikes(
        &self,
    ) -> impl Future<Output = Result<Vec<StrikeRecord>, ClientError>> + Send;

    /// Current weather for `city`.
    fn weather(
        &self,
        city: &str,
    ) -> impl Future<Output = Result<WeatherSnapshot, ClientError>> + Send;

    /// Place suggestions for `query`.
    fn search_cities(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<CitySearchResult>, ClientError>> + Send;
}

/// reqwest-backed client for the dashboard's `/api` routes.
#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpDashboardApi {
    /// Create a client for the server at `base_url` (e.g.
    /// `http://127.0.0.1:5000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            timeout,
        }
    }

    /// Place name for a coordinate, or `"<lat>, <lon>"` when unknown.
    pub async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, ClientError> {
        let request = self
            .client
            .get(format!("{}/api/reverse-geocode", self.base_url))
            .query(&[("lat", coordinates.lat), ("lon", coordinates.lon)]);
        let result: ReverseGeocodeResult = self.send(request).await?;
        Ok(result.location)
    }

    /// Submit a strike and return the stored record.
    pub async fn submit_strike(&self, strike: &NewStrike) -> Result<StrikeRecord, ClientError> {
        let request = self
            .client
            .post(format!("{}/api/lightning", self.base_url))
            .json(strike);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            debug!(%status, body, "Dashboard API returned error");
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl DashboardApi for HttpDashboardApi {
    async fn recent_strikes(&self) -> Result<Vec<StrikeRecord>, ClientError> {
        let request = self.client.get(format!("{}/api/lightning", self.base_url));
        self.send(request).await
    }

    async fn weather(&self, city: &str) -> Result<WeatherSnapshot, ClientError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ClientError::Request(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Request("base URL cannot be a base".to_owned()))?
            .pop_if_empty()
            .extend(["api", "weather", city]);

        match self.send(self.client.get(url)).await {
            Err(ClientError::Status { status: 404, .. }) => Err(ClientError::CityNotFound),
            other => other,
        }
    }

    /// Queries shorter than [`MIN_SEARCH_LEN`] characters return `[]`
    /// without a request.
    async fn search_cities(&self, query: &str) -> Result<Vec<CitySearchResult>, ClientError> {
        if !is_searchable(query) {
            return Ok(Vec::new());
        }
        let request = self
            .client
            .get(format!("{}/api/cities/search", self.base_url))
            .query(&[("q", query)]);
        self.send(request).await
    }
}

/// The `error` field of a JSON error body, or the body itself.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.to_owned())
}
