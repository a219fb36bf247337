//! Axum router construction for the API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for the browser dashboard and per-request tracing.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /api/weather/{city}` -- current conditions
/// - `GET /api/cities/search` -- place autocomplete
/// - `GET /api/reverse-geocode` -- coordinate to place name
/// - `GET /api/lightning` -- recent strikes
/// - `POST /api/lightning` -- submit a strike
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/weather/{city}", get(handlers::get_weather))
        .route("/api/cities/search", get(handlers::search_cities))
        .route("/api/reverse-geocode", get(handlers::reverse_geocode))
        .route(
            "/api/lightning",
            get(handlers::list_lightning).post(handlers::create_lightning),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
