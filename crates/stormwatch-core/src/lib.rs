//! Process-level building blocks for the Storm Watch dashboard server.
//!
//! - [`config`] -- typed configuration loaded from `stormwatch-config.yaml`
//!   with environment overrides
//! - [`simulator`] -- the simulated lightning feed that periodically
//!   synthesizes strikes into the [`EventStore`]
//!
//! [`EventStore`]: stormwatch_store::EventStore

pub mod config;
pub mod simulator;

pub use config::{ConfigError, DashboardConfig};
pub use simulator::{LightningSimulator, SimulatorError, SimulatorHandle};
