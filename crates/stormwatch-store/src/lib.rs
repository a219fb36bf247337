//! In-memory lightning strike store for the Storm Watch dashboard.
//!
//! The [`EventStore`] holds the working set of recent strikes. It is
//! constructed once at process start and shared by [`Arc`] with the
//! simulated feed and the HTTP layer; tests construct as many isolated
//! instances as they need.
//!
//! Records leave the store only through age-based eviction, evaluated
//! lazily on write, or through the optional hard cap on record count.
//!
//! [`Arc`]: std::sync::Arc

pub mod error;
pub mod store;
pub mod validation;

pub use error::StoreError;
pub use store::{DEFAULT_MAX_RECORDS, DEFAULT_RECENT_LIMIT, EventStore, StoreStats, cutoff_for};
