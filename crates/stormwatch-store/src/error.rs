//! Error types for the strike store.

/// Errors returned by [`EventStore`](crate::EventStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The submitted strike failed validation and was not stored.
    #[error("invalid strike: {reason}")]
    Validation {
        /// Which field was rejected and why.
        reason: String,
    },
}
