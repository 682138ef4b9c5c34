//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// An API key contains characters that cannot travel in a header.
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
