//! Current-conditions weather snapshot served by `GET /api/weather/{city}`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinates;

/// A point-in-time weather reading for one place.
///
/// Pass-through of the weather provider's response, normalised to metric
/// units. Not stored; fetched fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Place label, `"<name>, <country>"`.
    pub location: String,
    /// Position reported by the provider.
    pub coordinates: Coordinates,
    /// Air temperature in degrees Celsius, rounded.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Wind speed in km/h, rounded.
    pub wind_speed: f64,
    /// Visibility in km, rounded; absent when the provider omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub visibility: Option<f64>,
    /// Short condition text, e.g. `"light rain"`.
    pub description: String,
    /// Provider icon code, e.g. `"10d"`.
    pub icon: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uses_camel_case_and_omits_missing_visibility() {
        let snapshot = WeatherSnapshot {
            location: String::from("Chicago, US"),
            coordinates: Coordinates::new(41.85, -87.65),
            temperature: 18.0,
            humidity: 60.0,
            wind_speed: 22.0,
            visibility: None,
            description: String::from("scattered clouds"),
            icon: String::from("03d"),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["windSpeed"], 22.0);
        assert!(json.get("visibility").is_none());
    }
}
