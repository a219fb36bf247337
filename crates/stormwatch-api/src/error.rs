//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The body
//! is always `{"error": <message>, "status": <code>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stormwatch_providers::ProviderError;
use stormwatch_store::StoreError;
use tracing::error;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A required query parameter is missing or malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The request body could not be read as the expected JSON shape.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// The store rejected the submitted strike.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An upstream provider call failed.
    #[error("{action}: {source}")]
    Provider {
        /// Generic description of what failed, returned to the client.
        action: &'static str,
        /// The underlying provider error, logged only.
        source: ProviderError,
    },
}

impl ApiError {
    /// Wrap a provider error with the client-facing action message.
    pub const fn provider(action: &'static str, source: ProviderError) -> Self {
        Self::Provider { action, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidQuery(msg) | Self::InvalidBody(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Store(StoreError::Validation { reason }) => {
                (StatusCode::BAD_REQUEST, format!("Invalid lightning strike: {reason}"))
            }
            Self::Provider { action, source } => match source {
                ProviderError::NotConfigured { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, source.to_string())
                }
                ProviderError::NotFound(_) => (StatusCode::NOT_FOUND, "City not found".to_owned()),
                ProviderError::Upstream(_) | ProviderError::Decode(_) => {
                    error!(error = %source, "{action}");
                    (StatusCode::INTERNAL_SERVER_ERROR, (*action).to_owned())
                }
            },
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
