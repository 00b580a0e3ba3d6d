//! Error types for triage
//!
//! Centralized error handling using thiserror.

use std::time::Duration;

use thiserror::Error;

/// All error types that can occur in triage
#[derive(Debug, Error)]
pub enum TriageError {
    /// Malformed input (bad path segment, missing parameter)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The remote service returned 429
    #[error("Rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Transport-level failure talking to a remote service
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Model response could not be parsed; the raw text is kept for diagnosis
    #[error("Unparseable response: {message}")]
    Unparseable { message: String, raw: String },

    /// State file could not be written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Listing issues for selection failed
    #[error("Failed to fetch issues")]
    FetchFailed(#[source] Box<TriageError>),

    /// Missing credentials or unusable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TriageError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, TriageError::RateLimited { .. })
    }

    /// Whether a retry could plausibly succeed. Rate limits are surfaced to the
    /// caller instead of being retried blindly, and so are bodies that arrived
    /// but failed to decode.
    pub fn is_retryable(&self) -> bool {
        match self {
            TriageError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            TriageError::Api { status, .. } => *status >= 500,
            TriageError::FetchFailed(inner) => inner.is_retryable(),
            TriageError::Validation(_)
            | TriageError::RateLimited { .. }
            | TriageError::Unparseable { .. }
            | TriageError::Persistence(_)
            | TriageError::Config(_)
            | TriageError::Io(_)
            | TriageError::Json(_) => false,
        }
    }

    /// Retry-after hint carried by a rate-limit error, looking through wrappers.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TriageError::RateLimited { retry_after } => Some(*retry_after),
            TriageError::FetchFailed(inner) => inner.retry_after(),
            _ => None,
        }
    }
}

/// Result type alias for triage operations
pub type Result<T> = std::result::Result<T, TriageError>;
