//! Notifier that renders notifications as log lines.

use walletlink_application::ports::Notifier;
use walletlink_domain::{Notification, NotificationStyle};

/// Writes each notification through `tracing`, at a level matching its
/// style.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        let Notification {
            key,
            title,
            message,
            count,
            ..
        } = notification;
        match notification.style {
            NotificationStyle::Error => tracing::error!(%key, count, "{title}: {message}"),
            NotificationStyle::Warning => tracing::warn!(%key, count, "{title}: {message}"),
            NotificationStyle::Info => tracing::info!(%key, count, "{title}: {message}"),
        }
    }
}
