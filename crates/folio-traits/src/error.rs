//! Error types for collaborator calls.

use thiserror::Error;

/// Common error type for collaborator operations.
#[derive(Debug, Clone, Error)]
pub enum TraitError {
    /// Connection to external service failed
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Requested resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Source not available
    #[error("source not available: {0}")]
    SourceNotAvailable(String),

    /// Operation timed out
    #[error("timeout")]
    Timeout,

    /// Parse/deserialization error
    #[error("parse error: {0}")]
    ParseError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Rate limited
    #[error("rate limited")]
    RateLimited,

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl TraitError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Missing resources and malformed requests fail the same way every time.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TraitError::ConnectionFailed(_)
                | TraitError::SourceNotAvailable(_)
                | TraitError::Timeout
                | TraitError::IoError(_)
                | TraitError::RateLimited
        )
    }
}

impl From<std::io::Error> for TraitError {
    fn from(e: std::io::Error) -> Self {
        TraitError::IoError(e.to_string())
    }
}

impl From<folio_core::CoreError> for TraitError {
    fn from(e: folio_core::CoreError) -> Self {
        TraitError::InvalidInput(e.to_string())
    }
}
