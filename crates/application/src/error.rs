//! Application error types

use thiserror::Error;
use walletlink_domain::{ClassifiedError, DomainError, ErrorCategory};

use crate::ports::SettingsError;

/// A failed API call.
///
/// Always carries the full classification of the failure; `Display` is
/// the friendly message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .error.friendly_message)]
pub struct ApiError {
    error: ClassifiedError,
}

impl ApiError {
    /// Wraps a classification.
    #[must_use]
    pub const fn new(error: ClassifiedError) -> Self {
        Self { error }
    }

    /// Returns the classification.
    #[must_use]
    pub const fn classified(&self) -> &ClassifiedError {
        &self.error
    }

    /// Returns the failure category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.error.category
    }

    /// Returns true if the request was aborted by the caller.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.error.category == ErrorCategory::Canceled
    }

    /// Consumes the error, returning the classification.
    #[must_use]
    pub fn into_classified(self) -> ClassifiedError {
        self.error
    }
}

impl From<ClassifiedError> for ApiError {
    fn from(error: ClassifiedError) -> Self {
        Self::new(error)
    }
}

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Reading or writing persisted settings failed.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// An API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
