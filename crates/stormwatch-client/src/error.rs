//! Error types for dashboard API calls.

/// Errors returned by a [`DashboardApi`](crate::api::DashboardApi) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server could not be reached.
    #[error("request failed: {0}")]
    Request(String),

    /// The weather endpoint does not know the city.
    #[error("City not found")]
    CityNotFound,

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The `error` field of the response body, or the raw body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The dashboard poller is no longer running.
    #[error("dashboard poller stopped")]
    Stopped,
}
