//! Current-conditions weather client.
//!
//! Speaks the `OpenWeatherMap` 2.5 wire format:
//! `GET {base}/data/2.5/weather?q={city}&appid=..&units=metric`, and
//! normalises the response into a [`WeatherSnapshot`].

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use stormwatch_types::{Coordinates, WeatherSnapshot};
use tracing::debug;

use crate::error::ProviderError;

/// Public `OpenWeatherMap` API root.
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org";

/// Provider name used in error messages.
const PROVIDER: &str = "OpenWeatherMap";

/// Metres per second to kilometres per hour.
const MS_TO_KMH: f64 = 3.6;

/// Metres per kilometre.
const METRES_PER_KM: f64 = 1000.0;

/// HTTP client for the weather provider.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

// ---------------------------------------------------------------------------
// Provider response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    name: String,
    sys: Sys,
    coord: Coord,
    main: Main,
    wind: Wind,
    #[serde(default)]
    visibility: Option<f64>,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Sys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

/// Round to the nearest integer with halves going toward positive
/// infinity, so `-2.5` becomes `-2` and `2.5` becomes `3`.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

impl TryFrom<CurrentWeatherResponse> for WeatherSnapshot {
    type Error = ProviderError;

    fn try_from(data: CurrentWeatherResponse) -> Result<Self, Self::Error> {
        let condition = data
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode("weather response has no conditions".to_owned()))?;

        Ok(Self {
            location: format!("{}, {}", data.name, data.sys.country),
            coordinates: Coordinates::new(data.coord.lat, data.coord.lon),
            temperature: round_half_up(data.main.temp),
            humidity: data.main.humidity,
            wind_speed: round_half_up(data.wind.speed * MS_TO_KMH),
            // Zero visibility is reported by the provider when unknown.
            visibility: data
                .visibility
                .filter(|metres| *metres > 0.0)
                .map(|metres| round_half_up(metres / METRES_PER_KM)),
            description: condition.description,
            icon: condition.icon,
        })
    }
}

impl WeatherClient {
    /// Create a weather client.
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

    /// Current conditions for `city`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] without a key,
    /// [`ProviderError::NotFound`] if the provider does not know the city,
    /// and [`ProviderError::Upstream`] / [`ProviderError::Decode`] for
    /// other failures.
    pub async fn current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured { provider: PROVIDER })?;
        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("weather request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(format!("city {city}")));
        }
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ProviderError::Upstream(format!(
                "weather returned {status}: {error_body}"
            )));
        }

        let data: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("weather response parse failed: {e}")))?;

        let snapshot = WeatherSnapshot::try_from(data)?;
        debug!(city, location = snapshot.location, "Weather fetched");
        Ok(snapshot)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn sample(visibility: Option<f64>) -> CurrentWeatherResponse {
        serde_json::from_value(serde_json::json!({
            "name": "Chicago",
            "sys": { "country": "US" },
            "coord": { "lat": 41.85, "lon": -87.65 },
            "main": { "temp": 17.6, "humidity": 62 },
            "wind": { "speed": 5.1 },
            "visibility": visibility,
            "weather": [{ "description": "light rain", "icon": "10d" }],
        }))
        .unwrap()
    }

    #[test]
    fn converts_units_and_rounds() {
        let snapshot = WeatherSnapshot::try_from(sample(Some(9_600.0))).unwrap();
        assert_eq!(snapshot.location, "Chicago, US");
        assert_eq!(snapshot.temperature, 18.0);
        assert_eq!(snapshot.humidity, 62.0);
        // 5.1 m/s = 18.36 km/h
        assert_eq!(snapshot.wind_speed, 18.0);
        assert_eq!(snapshot.visibility, Some(10.0));
        assert_eq!(snapshot.description, "light rain");
        assert_eq!(snapshot.icon, "10d");
    }

    #[test]
    fn halves_round_toward_positive_infinity() {
        let mut data = sample(Some(2_500.0));
        data.main.temp = -2.5;
        let snapshot = WeatherSnapshot::try_from(data).unwrap();
        assert_eq!(snapshot.temperature, -2.0);
        assert_eq!(snapshot.visibility, Some(3.0));

        assert_eq!(round_half_up(-0.5), 0.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(17.4), 17.0);
    }

    #[test]
    fn zero_or_missing_visibility_is_omitted() {
        assert_eq!(WeatherSnapshot::try_from(sample(None)).unwrap().visibility, None);
        assert_eq!(WeatherSnapshot::try_from(sample(Some(0.0))).unwrap().visibility, None);
    }

    #[test]
    fn missing_conditions_is_a_decode_error() {
        let mut data = sample(None);
        data.weather.clear();
        assert!(matches!(
            WeatherSnapshot::try_from(data),
            Err(ProviderError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = WeatherClient::new(DEFAULT_WEATHER_URL, None, Duration::from_secs(1));
        assert!(!client.is_configured());
        assert!(client.current("Chicago").await.unwrap_err().is_not_configured());
    }
}
