//! Dashboard client for Storm Watch.
//!
//! Keeps a locally cached view of the recent-strikes list and of the
//! weather for the selected location, each refreshed on its own schedule:
//!
//! - [`view`] -- the per-view polling state machine (pure, clock passed in)
//! - [`poller`] -- the async driver owning both views, fed by commands and
//!   publishing [`DashboardSnapshot`]s
//! - [`api`] -- the [`DashboardApi`] seam and its HTTP implementation
//! - [`location`] -- deriving the weather key from a selected location
//! - [`format`] -- presentation helpers for strike lists

pub mod api;
pub mod cache;
pub mod error;
pub mod format;
pub mod location;
pub mod poller;
pub mod view;

pub use api::{DashboardApi, HttpDashboardApi};
pub use error::ClientError;
pub use location::{weather_key, SelectedLocation, DEFAULT_WEATHER_CITY};
pub use poller::{DashboardPoller, DashboardSnapshot, PollerCommand, PollerConfig, PollerHandle};
pub use view::{PolledView, Ticket, ViewSnapshot, ViewStatus};
