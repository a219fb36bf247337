//! Deriving the weather lookup key from the selected location.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use stormwatch_types::Coordinates;

/// City used for weather when nothing is selected.
pub const DEFAULT_WEATHER_CITY: &str = "San Francisco";

/// Names like `"37.7749, -122.4194"`, produced when a map click has not
/// been resolved to a place yet.
static COORDINATE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d+,\s*-?\d+\.\d+$").ok());

/// A place the user picked from search or the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedLocation {
    /// Display name, e.g. `"Chicago, Illinois, United States"`.
    pub name: String,
    /// Where the place is.
    pub coordinates: Coordinates,
}

impl SelectedLocation {
    /// Create a selection.
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }
}

/// Whether `name` is a raw `"lat, lon"` pair rather than a place name.
pub fn is_coordinate_name(name: &str) -> bool {
    COORDINATE_NAME
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name))
}

/// Weather key for the current selection.
///
/// `None` means the weather query is suppressed until the selection has a
/// real place name.
pub fn weather_key(selection: Option<&SelectedLocation>) -> Option<String> {
    let Some(selection) = selection else {
        return Some(DEFAULT_WEATHER_CITY.to_owned());
    };
    if is_coordinate_name(&selection.name) {
        return None;
    }
    let city = selection
        .name
        .split(',')
        .next()
        .unwrap_or_default()
        .trim();
    (!city.is_empty()).then(|| city.to_owned())
}
