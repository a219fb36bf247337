//! Error types for provider calls.

/// Errors that can occur when calling an upstream provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API credential is configured for the provider.
    #[error("{provider} API key not configured")]
    NotConfigured {
        /// Human-readable provider name.
        provider: &'static str,
    },

    /// The provider could not resolve the requested place.
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider was unreachable or returned a non-success status.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The provider's response did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether this error is a missing credential.
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }
}
