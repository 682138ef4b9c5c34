//! Aggregated error records and the notifications derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::{ErrorCategory, Severity};

/// One de-duplicated error signature and how often it has occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedError {
    /// Dedup key: `category|endpoint|title|message` after normalization.
    pub key: String,
    /// Number of occurrences, including silent ones.
    pub count: u32,
    /// When a notification for this entry was last shown.
    pub last_seen: DateTime<Utc>,
    /// Failure category.
    pub category: ErrorCategory,
    /// Friendly endpoint label.
    pub endpoint: String,
    /// Title of the most recent occurrence.
    pub title: String,
    /// Message of the most recent occurrence.
    pub message: String,
    /// Severity of the most recent occurrence.
    pub severity: Severity,
    /// Suggested user action, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_action: Option<String>,
}

/// Visual treatment of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStyle {
    /// Blocking, error-styled.
    Error,
    /// Cautionary.
    Warning,
    /// Informational.
    Info,
}

impl NotificationStyle {
    /// Maps a severity onto its presentation style.
    #[must_use]
    pub const fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => Self::Error,
            Severity::Warning => Self::Warning,
            Severity::Medium | Severity::Low | Severity::Info => Self::Info,
        }
    }
}

/// A notification the aggregator decided to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Key of the aggregated entry, usable for dismissal.
    pub key: String,
    /// Presentation style.
    pub style: NotificationStyle,
    /// Headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Occurrence count at the time it was shown.
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_style() {
        assert_eq!(NotificationStyle::for_severity(Severity::Critical), NotificationStyle::Error);
        assert_eq!(NotificationStyle::for_severity(Severity::High), NotificationStyle::Error);
        assert_eq!(NotificationStyle::for_severity(Severity::Medium), NotificationStyle::Info);
        assert_eq!(NotificationStyle::for_severity(Severity::Info), NotificationStyle::Info);
        assert_eq!(NotificationStyle::for_severity(Severity::Warning), NotificationStyle::Warning);
    }
}
