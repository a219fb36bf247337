//! Shared type definitions for the Storm Watch dashboard.
//!
//! This crate is the single source of truth for the JSON shapes exchanged
//! between the dashboard server and its clients. Types flow downstream to
//! `TypeScript` via `ts-rs` for the browser front-end.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for strike identifiers
//! - [`geo`] -- Coordinates and place lookup results
//! - [`strike`] -- Lightning strike records and submissions
//! - [`weather`] -- Current-conditions weather snapshot

pub mod geo;
pub mod ids;
pub mod strike;
pub mod weather;

// Re-export all public types at crate root for convenience.
pub use geo::{CitySearchResult, Coordinates, ReverseGeocodeResult};
pub use ids::StrikeId;
pub use strike::{Intensity, NewStrike, StrikeRecord};
pub use weather::WeatherSnapshot;
