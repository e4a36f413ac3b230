//! Source error taxonomy
//!
//! Separates transient upstream trouble from malformed payloads and
//! rejected credentials. The retry layer and the job runner both key
//! off `is_retryable`.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by upstream connectors
///
/// The field is `provider` rather than `source` so thiserror does not
/// treat it as the error cause.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    #[error("{provider} rate limited")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("{provider} returned a malformed payload: {reason}")]
    Malformed { provider: String, reason: String },

    #[error("{provider} rejected the configured credentials")]
    AuthRejected { provider: String },
}

/// Result type alias for connector calls
pub type SourceResult<T> = std::result::Result<T, SourceError>;

impl SourceError {
    /// Whether a retry with backoff can plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::Unavailable { .. } | SourceError::RateLimited { .. }
        )
    }

    /// Name of the source the error came from
    pub fn source_name(&self) -> &str {
        match self {
            SourceError::Unavailable { provider, .. }
            | SourceError::RateLimited { provider, .. }
            | SourceError::Malformed { provider, .. }
            | SourceError::AuthRejected { provider } => provider,
        }
    }

    /// Stable label for the source_errors_total metric
    pub fn reason_label(&self) -> &'static str {
        match self {
            SourceError::Unavailable { .. } => "unavailable",
            SourceError::RateLimited { .. } => "rate-limited",
            SourceError::Malformed { .. } => "malformed",
            SourceError::AuthRejected { .. } => "auth-rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let unavailable = SourceError::Unavailable {
            provider: "arxiv".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(unavailable.is_retryable());

        let limited = SourceError::RateLimited {
            provider: "github".to_string(),
            retry_after: Some(Duration::from_secs(60)),
        };
        assert!(limited.is_retryable());

        let malformed = SourceError::Malformed {
            provider: "arxiv".to_string(),
            reason: "truncated feed".to_string(),
        };
        assert!(!malformed.is_retryable());

        let rejected = SourceError::AuthRejected {
            provider: "semantic-scholar".to_string(),
        };
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_source_name_and_label() {
        let err = SourceError::RateLimited {
            provider: "github".to_string(),
            retry_after: None,
        };
        assert_eq!(err.source_name(), "github");
        assert_eq!(err.reason_label(), "rate-limited");
    }

    #[test]
    fn test_display_names_source() {
        let err = SourceError::Unavailable {
            provider: "arxiv".to_string(),
            message: "HTTP 503".to_string(),
        };
        assert_eq!(err.to_string(), "arxiv unavailable: HTTP 503");
    }
}
