//! HTTP API for the Storm Watch dashboard.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Lightning endpoints** (`GET`/`POST /api/lightning`) reading and
//!   writing the shared [`EventStore`]
//! - **Weather proxy** (`GET /api/weather/{city}`) normalising the weather
//!   provider's current conditions
//! - **Geocoding proxies** (`GET /api/cities/search`,
//!   `GET /api/reverse-geocode`)
//!
//! Provider credentials never leave the server. Upstream failures are
//! logged in full and answered with a generic JSON error body.
//!
//! [`EventStore`]: stormwatch_store::EventStore

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::AppState;
