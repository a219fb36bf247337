//! Geographic coordinates and geocoding result shapes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: core::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: core::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A latitude/longitude pair in decimal degrees (WGS 84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Coordinates {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl Coordinates {
    /// Create a coordinate pair without validation.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && LATITUDE_RANGE.contains(&self.lat)
            && LONGITUDE_RANGE.contains(&self.lon)
    }

    /// Clamp both components into their valid ranges.
    ///
    /// Non-finite components are left untouched so validation still
    /// rejects them.
    pub fn clamped(self) -> Self {
        Self {
            lat: self.lat.clamp(*LATITUDE_RANGE.start(), *LATITUDE_RANGE.end()),
            lon: self.lon.clamp(*LONGITUDE_RANGE.start(), *LONGITUDE_RANGE.end()),
        }
    }
}

impl core::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// One place suggestion returned by `GET /api/cities/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct CitySearchResult {
    /// Full display name, e.g. `"Chicago, Illinois, United States"`.
    pub place_name: String,
    /// Centre point of the place.
    pub coordinates: Coordinates,
    /// Enclosing regions (state, country, ...), innermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub context: Option<Vec<String>>,
}

/// Response body of `GET /api/reverse-geocode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReverseGeocodeResult {
    /// Place name, or `"<lat>, <lon>"` when the provider has no match.
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_checks() {
        assert!(Coordinates::new(37.7749, -122.4194).is_valid());
        assert!(Coordinates::new(90.0, 180.0).is_valid());
        assert!(Coordinates::new(-90.0, -180.0).is_valid());
        assert!(!Coordinates::new(90.5, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.01).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn clamping_pulls_into_range() {
        let c = Coordinates::new(90.7, -181.2).clamped();
        assert!(c.is_valid());
        assert!((c.lat - 90.0).abs() < f64::EPSILON);
        assert!((c.lon + 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn display_matches_fallback_label() {
        assert_eq!(
            Coordinates::new(37.7749, -122.4194).to_string(),
            "37.7749, -122.4194"
        );
    }

    #[test]
    fn city_result_uses_camel_case() {
        let result = CitySearchResult {
            place_name: String::from("Chicago, Illinois, United States"),
            coordinates: Coordinates::new(41.8781, -87.6298),
            context: None,
        };
        let json = serde_json::to_value(&result).unwrap_or_default();
        assert_eq!(json["placeName"], "Chicago, Illinois, United States");
        assert!(json.get("context").is_none());
    }
}
