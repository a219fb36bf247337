//! Upstream provider clients for the Storm Watch dashboard.
//!
//! Two collaborators sit behind the dashboard API:
//!
//! - a place-search geocoder ([`GeocodingClient`], Mapbox geocoding v5
//!   wire format) used for city autocomplete and reverse lookups, and
//! - a current-conditions weather service ([`WeatherClient`],
//!   `OpenWeatherMap` 2.5 wire format).
//!
//! Both need an API credential. A missing credential is reported as
//! [`ProviderError::NotConfigured`] on each call rather than at
//! construction, so the server still starts and serves the endpoints that
//! do not depend on that provider.

pub mod error;
pub mod geocoding;
pub mod weather;

pub use error::ProviderError;
pub use geocoding::{GeocodingClient, ReverseGeocoder, DEFAULT_GEOCODING_URL};
pub use weather::{WeatherClient, DEFAULT_WEATHER_URL};
