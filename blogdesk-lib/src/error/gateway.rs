//! Gateway error types

/// Errors reported by a [`Gateway`](crate::gateway::Gateway) implementation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Database error from the SQLite store.
    #[error("Database error: {0}")]
    Database(#[from] async_sqlite::Error),

    /// No row exists with the given id.
    #[error("Row '{0}' not found")]
    NotFound(String),

    /// The request was rejected (bad input, unknown column).
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The backend is not reachable.
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// A batch mutation was only partially applied.
    #[error("Batch partially applied: {removed} removed, {failed} failed")]
    Partial { removed: usize, failed: usize },

    /// Failed to decode a stored value.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Creates a new rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Creates a new unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns `true` if the same request may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Database(_))
    }
}
