//! Error taxonomy for failed API requests.
//!
//! A [`ClassifiedError`] is produced once per failed request and is never
//! mutated afterwards. Its category drives retry decisions in the transport
//! client and grouping in the error aggregator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No response was received (DNS, refused connection, CORS).
    Network,
    /// The client gave up waiting for a response.
    Timeout,
    /// 401: the API key is missing or rejected.
    Auth,
    /// 403: the key is valid but not allowed to do this.
    Permission,
    /// 404
    NotFound,
    /// 429
    RateLimit,
    /// 5xx
    ServerError,
    /// The caller aborted the request.
    Canceled,
    /// Any other status-bearing failure.
    #[serde(rename = "http_4xx")]
    Http4xx,
    /// A failure with no status that fits no other category.
    Unknown,
}

impl ErrorCategory {
    /// Returns the wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::NotFound => "not_found",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Canceled => "canceled",
            Self::Http4xx => "http_4xx",
            Self::Unknown => "unknown",
        }
    }

    /// Returns a human-readable title for this category.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Network => "Connection Problem",
            Self::Timeout => "Request Timeout",
            Self::Auth => "Authentication Required",
            Self::Permission => "Access Denied",
            Self::NotFound => "Not Found",
            Self::RateLimit => "Too Many Requests",
            Self::ServerError => "Server Error",
            Self::Canceled => "Request Canceled",
            Self::Http4xx => "Request Failed",
            Self::Unknown => "Unexpected Error",
        }
    }

    /// Returns the action a user can take to resolve the failure, if any.
    #[must_use]
    pub const fn user_action(self) -> Option<&'static str> {
        match self {
            Self::Network => Some("Check your connection and the API address in settings"),
            Self::Timeout => Some("The server may be slow or overloaded; try again shortly"),
            Self::Auth => Some("Check the API key in settings"),
            Self::Permission => Some("Use an API key with access to this resource"),
            Self::RateLimit => Some("Wait a moment before retrying"),
            Self::ServerError => Some("Try again later; the wallet service reported a fault"),
            Self::Http4xx => Some("Check the request details and try again"),
            Self::NotFound | Self::Canceled | Self::Unknown => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How loudly a failure should be presented.
///
/// The classifier only produces `Low` through `Critical`; `Info` and
/// `Warning` are available to producers that publish their own payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational only.
    Info,
    /// Expected, user-initiated outcome.
    Low,
    /// Needs attention but is not an error.
    Warning,
    /// Recoverable error.
    Medium,
    /// Blocks the current action.
    High,
    /// The backend itself is failing.
    Critical,
}

impl Severity {
    /// Returns the wire name of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Warning => "warning",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured, taxonomy-tagged description of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    /// Failure category.
    pub category: ErrorCategory,
    /// Presentation severity.
    pub severity: Severity,
    /// Whether repeating the request may succeed.
    pub is_retryable: bool,
    /// Message safe to show to a user.
    pub friendly_message: String,
    /// Human-readable endpoint label, e.g. "balance query".
    pub friendly_endpoint: String,
    /// Grouping category of the endpoint, e.g. "wallet".
    pub endpoint_category: String,
    /// Raw request path.
    pub original_endpoint: String,
    /// HTTP status, when a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.friendly_message, self.friendly_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn category_wire_names_match_serde() {
        for category in [
            ErrorCategory::Network,
            ErrorCategory::RateLimit,
            ErrorCategory::Http4xx,
            ErrorCategory::NotFound,
        ] {
            let json = serde_json::to_value(category).unwrap_or_default();
            assert_eq!(json, serde_json::Value::from(category.as_str()));
        }
    }

    #[test]
    fn severity_orders_by_loudness() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Info < Severity::Low);
    }

    #[test]
    fn canceled_has_no_user_action() {
        assert_eq!(ErrorCategory::Canceled.user_action(), None);
        assert!(ErrorCategory::Auth.user_action().is_some());
    }
}
