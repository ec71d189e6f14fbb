//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the citation search service, providing
//! structured error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from parsing, network, upstream API, configuration
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Parsing, Network, Upstream, Configuration, Search
//!
//! ## Key Features
//! - Hierarchical error types with detailed context
//! - Automatic error conversion and chaining
//! - Recoverability classification driving the retry policy
//! - Structured logging integration

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types for the citation search service
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level failures (DNS, connect, broken transfer)
    #[error("Network error during {operation}: {details}")]
    Network { operation: String, details: String },

    /// Upstream throttling persisted through every retry
    #[error("Rate limit exceeded for {upstream} (HTTP {status}) after {attempts} attempts")]
    RateLimitExceeded {
        upstream: String,
        status: u16,
        attempts: u32,
    },

    /// Upstream returned a non-2xx status that is not retryable
    #[error("Upstream returned HTTP {status}: {details}")]
    UpstreamStatus { status: u16, details: String },

    /// Upstream response body could not be interpreted
    #[error("Failed to parse data from {upstream}: {details}")]
    DataParsing { upstream: String, details: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// Rejected search input
    #[error("Invalid search query: {query} - {reason}")]
    InvalidSearchQuery { query: String, reason: String },

    /// The caller-supplied deadline ran out mid-cascade
    #[error("Deadline exceeded after {elapsed_ms}ms during {operation}")]
    DeadlineExceeded { operation: String, elapsed_ms: u64 },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SearchError {
    /// Check if the error is recoverable (worth retrying or continuing past)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::Network { .. }
                | SearchError::RateLimitExceeded { .. }
                | SearchError::DeadlineExceeded { .. }
                | SearchError::Http(_)
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SearchError::Network { .. } | SearchError::Http(_) => "network",
            SearchError::RateLimitExceeded { .. } => "rate_limit",
            SearchError::UpstreamStatus { .. } => "upstream",
            SearchError::DataParsing { .. } | SearchError::Json(_) => "parsing",
            SearchError::Config { .. } | SearchError::Toml(_) => "configuration",
            SearchError::ValidationFailed { .. } | SearchError::InvalidSearchQuery { .. } => {
                "validation"
            }
            SearchError::DeadlineExceeded { .. } => "timeout",
            SearchError::Internal { .. } | SearchError::Io(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_errors_are_recoverable() {
        let err = SearchError::RateLimitExceeded {
            upstream: "CourtListener".to_string(),
            status: 429,
            attempts: 4,
        };
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "rate_limit");
    }

    #[test]
    fn upstream_status_is_terminal() {
        let err = SearchError::UpstreamStatus {
            status: 500,
            details: "server error".to_string(),
        };
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), "upstream");
    }

    #[test]
    fn display_includes_context() {
        let err = SearchError::DeadlineExceeded {
            operation: "clusters query".to_string(),
            elapsed_ms: 30_000,
        };
        assert!(err.to_string().contains("30000ms"));
        assert!(err.to_string().contains("clusters query"));
    }
}
