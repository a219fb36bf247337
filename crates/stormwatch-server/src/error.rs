//! Error types for the server binary.
//!
//! [`ServerBinError`] wraps every failure mode during startup and
//! shutdown so `main` can propagate with `?`.

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum ServerBinError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: stormwatch_core::ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: stormwatch_api::ServerError,
    },

    /// The lightning simulator did not stop cleanly.
    #[error("simulator error: {source}")]
    Simulator {
        /// The underlying simulator error.
        #[from]
        source: stormwatch_core::SimulatorError,
    },
}
