//! Notifier port: where surfaced notifications are rendered.

use walletlink_domain::Notification;

/// Sink for notifications the error aggregator decided to show.
pub trait Notifier: Send + Sync {
    /// Renders one notification.
    fn notify(&self, notification: &Notification);
}
