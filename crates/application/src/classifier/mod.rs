//! Error classifier
//!
//! Maps a raw [`TransportFailure`] plus the originating request onto a
//! [`ClassifiedError`]. Classification is total and pure: the same inputs
//! always produce an identical result.

mod endpoints;

pub use endpoints::{FALLBACK_CATEGORY, ResolvedEndpoint, resolve_endpoint};

use walletlink_domain::{ClassifiedError, ErrorCategory, RequestDescriptor, Severity};

use crate::ports::TransportFailure;

/// Message attached to every canceled request.
pub const CANCELED_MESSAGE: &str = "request canceled";

/// Classifies a failed request. Rules are checked in priority order and
/// the first match wins.
#[must_use]
pub fn classify(failure: &TransportFailure, request: &RequestDescriptor) -> ClassifiedError {
    let endpoint = resolve_endpoint(&request.path);
    let name = endpoint.name.as_str();

    let (category, severity, is_retryable, friendly_message) = match failure {
        TransportFailure::Canceled => (
            ErrorCategory::Canceled,
            Severity::Low,
            false,
            CANCELED_MESSAGE.to_string(),
        ),
        TransportFailure::Timeout { timeout_ms } => (
            ErrorCategory::Timeout,
            Severity::Medium,
            true,
            format!("The {name} request timed out after {timeout_ms}ms"),
        ),
        TransportFailure::Network(_) => (
            ErrorCategory::Network,
            Severity::High,
            true,
            format!("Unable to reach the wallet service for the {name} request"),
        ),
        TransportFailure::Status { status, body } => {
            classify_status(*status, body.as_deref(), request, name)
        }
        TransportFailure::InvalidRequest(detail) | TransportFailure::InvalidResponse(detail) => (
            ErrorCategory::Unknown,
            Severity::Medium,
            false,
            format!("Unexpected error during the {name} request: {detail}"),
        ),
    };

    ClassifiedError {
        category,
        severity,
        is_retryable,
        friendly_message,
        friendly_endpoint: endpoint.name,
        endpoint_category: endpoint.category,
        original_endpoint: request.path.clone(),
        status: failure.status(),
    }
}

fn classify_status(
    status: u16,
    body: Option<&str>,
    request: &RequestDescriptor,
    name: &str,
) -> (ErrorCategory, Severity, bool, String) {
    match status {
        401 => (
            ErrorCategory::Auth,
            Severity::High,
            false,
            format!("Authentication failed for the {name} request; the API key is missing or invalid"),
        ),
        403 => (
            ErrorCategory::Permission,
            Severity::High,
            false,
            format!("Not allowed to access the {name} endpoint"),
        ),
        404 => (
            ErrorCategory::NotFound,
            Severity::Medium,
            false,
            format!("The {name} endpoint was not found"),
        ),
        429 => (
            ErrorCategory::RateLimit,
            Severity::Medium,
            true,
            format!("Too many {name} requests; the service is rate limiting"),
        ),
        s if s >= 500 => (
            ErrorCategory::ServerError,
            Severity::Critical,
            true,
            format!("The wallet service failed while handling the {name} request (HTTP {s})"),
        ),
        s => {
            let mut message = format!("The {name} request failed (HTTP {s})");
            if let Some(detail) = body.and_then(server_message) {
                message.push_str(": ");
                message.push_str(&detail);
            }
            (
                ErrorCategory::Http4xx,
                Severity::Medium,
                request.method.is_idempotent(),
                message,
            )
        }
    }
}

/// Extracts `message` or `error` from a JSON error body.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
