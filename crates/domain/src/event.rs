//! Event payloads published on the API event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classification::{ClassifiedError, Severity};
use crate::request::{HttpMethod, RequestDescriptor};

/// Where a surfaced failure came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    /// Method of the failed request.
    pub method: HttpMethod,
    /// Raw path of the failed request.
    pub path: String,
    /// Identifier of the failed request.
    pub request_id: Uuid,
    /// Whether the failure happened on the retry attempt.
    pub retried: bool,
    /// When the failure was observed.
    pub occurred_at: DateTime<Utc>,
}

/// Payload of the `api-error` channel.
///
/// Carries the full classification plus the presentation fields a
/// notification needs. Exists only while being dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorPayload {
    /// The classification of the failure.
    #[serde(flatten)]
    pub error: ClassifiedError,
    /// Short headline.
    pub title: String,
    /// Suggested user action, if one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_action: Option<String>,
    /// Originating request, if the failure came from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_context: Option<ErrorContext>,
}

impl ApiErrorPayload {
    /// Builds the payload for a classified request failure.
    #[must_use]
    pub fn from_classified(
        error: ClassifiedError,
        request: &RequestDescriptor,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: error.category.title().to_string(),
            user_action: error.category.user_action().map(str::to_string),
            error_context: Some(ErrorContext {
                method: request.method,
                path: request.path.clone(),
                request_id: request.id,
                retried: request.retried,
                occurred_at,
            }),
            error,
        }
    }

    /// Returns the message shown to the user.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.error.friendly_message
    }

    /// Returns the endpoint label used for grouping.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.error.friendly_endpoint
    }

    /// Returns the severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.error.severity
    }
}
