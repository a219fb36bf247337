//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/weather/{city}` | Current conditions for a city |
//! | `GET` | `/api/cities/search?q=` | Up to five place suggestions |
//! | `GET` | `/api/reverse-geocode?lat=&lon=` | Place name for a coordinate |
//! | `GET` | `/api/lightning` | Most recent strikes, newest first |
//! | `POST` | `/api/lightning` | Submit a strike |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use stormwatch_types::{Coordinates, NewStrike, ReverseGeocodeResult};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Queries shorter than this return no suggestions without calling the
/// provider.
const MIN_SEARCH_LEN: usize = 2;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/cities/search`.
#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    /// Free-text place query.
    pub q: Option<String>,
}

/// Query parameters for `GET /api/reverse-geocode`.
///
/// Kept as raw strings so a malformed number is answered with the same
/// 400 as a missing one.
#[derive(Debug, serde::Deserialize)]
pub struct ReverseGeocodeQuery {
    /// Latitude in decimal degrees.
    pub lat: Option<String>,
    /// Longitude in decimal degrees.
    pub lon: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /api/weather/{city}
// ---------------------------------------------------------------------------

/// Current weather for `city`, normalised to metric units.
pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .weather
        .current(&city)
        .await
        .map_err(|e| ApiError::provider("Failed to fetch weather data", e))?;
    Ok(Json(snapshot))
}

// ---------------------------------------------------------------------------
// GET /api/cities/search
// ---------------------------------------------------------------------------

/// Place suggestions for the search box.
///
/// Short or missing queries return `[]` before the credential is checked.
pub async fn search_cities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.q.unwrap_or_default();
    if query.chars().count() < MIN_SEARCH_LEN {
        return Ok(Json(Vec::new()));
    }

    let results = state
        .geocoding
        .search(&query)
        .await
        .map_err(|e| ApiError::provider("Failed to search cities", e))?;
    Ok(Json(results))
}

// ---------------------------------------------------------------------------
// GET /api/reverse-geocode
// ---------------------------------------------------------------------------

/// Place name for a coordinate, or `"<lat>, <lon>"` when unknown.
pub async fn reverse_geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseGeocodeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(lat_raw), Some(lon_raw)) = (params.lat, params.lon) else {
        return Err(required_coordinates());
    };
    let (Ok(lat), Ok(lon)) = (lat_raw.trim().parse::<f64>(), lon_raw.trim().parse::<f64>()) else {
        return Err(required_coordinates());
    };
    let coordinates = Coordinates::new(lat, lon);
    if !coordinates.is_valid() {
        return Err(required_coordinates());
    }

    let location = state
        .geocoding
        .reverse(coordinates)
        .await
        .map_err(|e| ApiError::provider("Failed to reverse geocode", e))?
        .unwrap_or_else(|| format!("{}, {}", lat_raw.trim(), lon_raw.trim()));

    Ok(Json(ReverseGeocodeResult { location }))
}

fn required_coordinates() -> ApiError {
    ApiError::InvalidQuery("Latitude and longitude are required".to_owned())
}

// ---------------------------------------------------------------------------
// /api/lightning
// ---------------------------------------------------------------------------

/// The most recent strikes, newest first.
pub async fn list_lightning(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let strikes = state.store.recent(state.lightning_limit).await;
    debug!(count = strikes.len(), "Listing lightning strikes");
    Json(strikes)
}

/// Store a client-submitted strike and return it with its new id.
pub async fn create_lightning(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewStrike>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(strike) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let record = state.store.add(strike).await?;
    info!(strike_id = %record.id, intensity = record.intensity.get(), "Strike submitted");
    Ok(Json(record))
}
