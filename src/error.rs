//! Error types for the triage engine.
//!
//! All errors are explicitly typed using thiserror. No panics in production code.

use thiserror::Error;

/// Central error type for all triage operations.
#[derive(Debug, Error)]
pub enum TriageError {
    /// A value outside its enumerated domain, or a lookup table missing an
    /// entry for an otherwise valid value. Always a programming or
    /// configuration error, never expected from well-formed input.
    #[error("Domain error: {0}")]
    Domain(String),

    /// The AI provider returned an error, an unexpected status, or a
    /// response that failed parsing or validation.
    #[error("AI provider error: {0}")]
    Provider(String),

    /// The per-provider rate limit window is exhausted.
    #[error("Rate limited for provider {provider}")]
    RateLimited {
        /// Provider whose window is exhausted.
        provider: String,
    },

    /// Transport-level failure: the request never produced an HTTP
    /// response (connection refused, timeout, request build error).
    /// The only retryable error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error (missing env vars, invalid values, bad tables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Regex pattern compilation error.
    #[error("Regex pattern error: {0}")]
    RegexPattern(#[from] regex::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TriageError {
    /// Whether this error is a transport-level failure worth retrying.
    ///
    /// Only connection and timeout failures retry; application-level
    /// responses (4xx/5xx with a body, malformed JSON, invalid values)
    /// count as an immediate model failure. The HTTP transport classifies
    /// reqwest errors into [`TriageError::Transport`] at the seam, so
    /// retryability never depends on the concrete transport.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result type alias for triage operations.
pub type Result<T> = std::result::Result<T, TriageError>;
