//! De-duplicating error aggregator.
//!
//! Listens on `api-error`, groups payloads by a normalized signature and
//! decides which occurrences reach the [`Notifier`]. Repeats are shown for
//! the first few occurrences, then only once the suppression window since
//! the last shown notification has elapsed.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use walletlink_domain::{AggregatedError, ApiErrorPayload, Notification, NotificationStyle};

use crate::event_bus::{EventBus, Subscription};
use crate::normalize::{dedup_key, suppression_window};
use crate::ports::{Clock, Notifier};

/// Retention and display limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Entry cap; the entries shown least recently are dropped first.
    pub max_entries: usize,
    /// Occurrences up to this count are always shown.
    pub always_show: u32,
    /// Entries are kept at least this long after they were last shown.
    pub min_retention: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            always_show: 3,
            min_retention: Duration::from_secs(60),
        }
    }
}

/// Error aggregator.
///
/// Entries are kept in `last_seen` order, oldest first.
pub struct ErrorAggregator {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    config: AggregatorConfig,
    entries: Mutex<IndexMap<String, AggregatedError>>,
}

impl ErrorAggregator {
    /// Creates an empty aggregator.
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>, config: AggregatorConfig) -> Self {
        Self {
            clock,
            notifier,
            config,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Subscribes to `api-error`. The subscription holds only a weak
    /// reference, so dropping the aggregator silences it.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> Subscription {
        let weak: Weak<Self> = Arc::downgrade(self);
        bus.on_api_error(move |payload| {
            if let Some(aggregator) = weak.upgrade() {
                aggregator.record(payload);
            }
        })
    }

    /// Records one failure and returns the notification that was shown for
    /// it, if any.
    pub fn record(&self, payload: &ApiErrorPayload) -> Option<Notification> {
        let now = self.clock.now();
        let key = dedup_key(
            payload.error.category.as_str(),
            payload.endpoint(),
            &payload.title,
            payload.message(),
        );

        let notification = {
            let mut entries = self.entries.lock();
            let shown = match entries.get_mut(&key) {
                Some(entry) => {
                    entry.count = entry.count.saturating_add(1);
                    entry.title.clone_from(&payload.title);
                    entry.message = payload.message().to_string();
                    entry.severity = payload.severity();
                    entry.user_action.clone_from(&payload.user_action);

                    let elapsed = (now - entry.last_seen).to_std().unwrap_or_default();
                    let show = entry.count <= self.config.always_show
                        || elapsed > suppression_window(entry.count);
                    if show {
                        entry.last_seen = now;
                    } else {
                        tracing::trace!(%key, count = entry.count, "suppressing repeated error");
                    }
                    show
                }
                None => {
                    entries.insert(
                        key.clone(),
                        AggregatedError {
                            key: key.clone(),
                            count: 1,
                            last_seen: now,
                            category: payload.error.category,
                            endpoint: payload.endpoint().to_string(),
                            title: payload.title.clone(),
                            message: payload.message().to_string(),
                            severity: payload.severity(),
                            user_action: payload.user_action.clone(),
                        },
                    );
                    true
                }
            };

            let notification = if shown {
                if let Some(index) = entries.get_index_of(&key) {
                    let last = entries.len() - 1;
                    entries.move_index(index, last);
                }
                entries.get(&key).map(present)
            } else {
                None
            };

            self.evict(&mut entries, now);
            notification
        };

        if let Some(notification) = &notification {
            let notifier = &self.notifier;
            if catch_unwind(AssertUnwindSafe(|| notifier.notify(notification))).is_err() {
                tracing::error!(key = %notification.key, "notifier panicked");
            }
        }
        notification
    }

    fn evict(&self, entries: &mut IndexMap<String, AggregatedError>, now: chrono::DateTime<chrono::Utc>) {
        let min_retention = self.config.min_retention;
        entries.retain(|_, entry| {
            let age = (now - entry.last_seen).to_std().unwrap_or_default();
            age <= suppression_window(entry.count).max(min_retention)
        });

        let excess = entries.len().saturating_sub(self.config.max_entries);
        if excess > 0 {
            tracing::debug!(dropped = excess, "aggregator at capacity");
            entries.drain(..excess);
        }
    }

    /// Returns a snapshot of the entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<AggregatedError> {
        self.entries.lock().values().cloned().collect()
    }

    /// Returns the entry for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<AggregatedError> {
        self.entries.lock().get(key).cloned()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forgets every entry.
    pub fn clear_all(&self) {
        self.entries.lock().clear();
    }

    /// Forgets one entry; absent keys are ignored.
    pub fn remove_by_key(&self, key: &str) {
        self.entries.lock().shift_remove(key);
    }
}

fn present(entry: &AggregatedError) -> Notification {
    let style = NotificationStyle::for_severity(entry.severity);
    let message = match (style, &entry.user_action) {
        (NotificationStyle::Warning, Some(action)) => format!("{} {action}", entry.message),
        _ => entry.message.clone(),
    };
    Notification {
        key: entry.key.clone(),
        style,
        title: entry.title.clone(),
        message,
        count: entry.count,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::FakeClock;
    use pretty_assertions::assert_eq;
    use walletlink_domain::{ClassifiedError, ErrorCategory, Severity};

    #[derive(Default)]
    struct Recorder {
        shown: Mutex<Vec<Notification>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, notification: &Notification) {
            self.shown.lock().push(notification.clone());
        }
    }

    struct Exploding;

    impl Notifier for Exploding {
        fn notify(&self, _: &Notification) {
            panic!("toast renderer crashed");
        }
    }

    fn payload(message: &str, severity: Severity) -> ApiErrorPayload {
        ApiErrorPayload {
            error: ClassifiedError {
                category: ErrorCategory::ServerError,
                severity,
                is_retryable: true,
                friendly_message: message.to_string(),
                friendly_endpoint: "balance".to_string(),
                endpoint_category: "wallet".to_string(),
                original_endpoint: "/wallets/w1/balance".to_string(),
                status: Some(503),
            },
            title: "Server Error".to_string(),
            user_action: Some("Try again shortly".to_string()),
            error_context: None,
        }
    }

    fn setup() -> (Arc<FakeClock>, Arc<Recorder>, ErrorAggregator) {
        let clock = Arc::new(FakeClock::new());
        let recorder = Arc::new(Recorder::default());
        let aggregator = ErrorAggregator::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&recorder) as Arc<dyn Notifier>,
            AggregatorConfig::default(),
        );
        (clock, recorder, aggregator)
    }

    #[test]
    fn rapid_repeats_are_suppressed_after_three() {
        let (clock, recorder, aggregator) = setup();

        for _ in 0..11 {
            aggregator.record(&payload("upstream unavailable", Severity::Critical));
            clock.advance(Duration::from_millis(100));
        }

        let shown = recorder.shown.lock();
        assert_eq!(shown.len(), 3);
        assert_eq!(shown.iter().map(|n| n.count).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(aggregator.entries()[0].count, 11);
    }

    #[test]
    fn volatile_fragments_share_an_entry() {
        let (_, _, aggregator) = setup();

        aggregator.record(&payload(
            "request 3f2b8c1e-9a4d-4e5f-8b6a-1c2d3e4f5a6b failed at 2024-05-01T10:00:00Z",
            Severity::High,
        ));
        aggregator.record(&payload(
            "request 0a1b2c3d-4e5f-4a6b-9c8d-7e6f5a4b3c2d failed at 2024-05-01T10:00:07Z",
            Severity::High,
        ));

        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.entries()[0].count, 2);
    }

    #[test]
    fn repeat_shown_again_after_window() {
        let (clock, recorder, aggregator) = setup();
        for _ in 0..4 {
            aggregator.record(&payload("down", Severity::High));
        }
        assert_eq!(recorder.shown.lock().len(), 3);

        // count 5 uses the 60s window, measured from the last shown one
        clock.advance(Duration::from_secs(61));
        let shown = aggregator.record(&payload("down", Severity::High));

        assert_eq!(shown.map(|n| n.count), Some(5));
        assert_eq!(recorder.shown.lock().len(), 4);
    }

    #[test]
    fn suppressed_repeat_keeps_last_seen() {
        let (clock, _, aggregator) = setup();
        for _ in 0..3 {
            aggregator.record(&payload("down", Severity::High));
        }
        let shown_at = aggregator.entries()[0].last_seen;

        clock.advance(Duration::from_secs(10));
        assert!(aggregator.record(&payload("down", Severity::High)).is_none());

        assert_eq!(aggregator.entries()[0].last_seen, shown_at);
    }

    #[test]
    fn styles_follow_severity() {
        let (_, _, aggregator) = setup();

        let error = aggregator.record(&payload("a", Severity::Critical)).unwrap();
        let info = aggregator.record(&payload("b", Severity::Medium)).unwrap();
        let warning = aggregator.record(&payload("c", Severity::Warning)).unwrap();

        assert_eq!(error.style, NotificationStyle::Error);
        assert_eq!(error.message, "a");
        assert_eq!(info.style, NotificationStyle::Info);
        assert_eq!(warning.style, NotificationStyle::Warning);
        assert_eq!(warning.message, "c Try again shortly");
    }

    #[test]
    fn capacity_drops_oldest() {
        let (clock, _, aggregator) = setup();
        for i in 0..105 {
            aggregator.record(&payload(&format!("failure kind {i}"), Severity::Low));
            clock.advance(Duration::from_millis(10));
        }

        let entries = aggregator.entries();
        assert_eq!(entries.len(), 100);
        assert_eq!(entries[0].message, "failure kind 5");
        assert_eq!(entries[99].message, "failure kind 104");
    }

    #[test]
    fn stale_entries_expire() {
        let (clock, _, aggregator) = setup();
        aggregator.record(&payload("old", Severity::Low));
        clock.advance(Duration::from_secs(61));
        aggregator.record(&payload("new", Severity::Low));

        let messages: Vec<_> = aggregator.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["new".to_string()]);
    }

    #[test]
    fn removal_and_clear_tolerate_absent_keys() {
        let (_, _, aggregator) = setup();
        aggregator.remove_by_key("missing");
        aggregator.clear_all();
        assert!(aggregator.is_empty());

        let shown = aggregator.record(&payload("x", Severity::Low)).unwrap();
        assert!(aggregator.get(&shown.key).is_some());
        aggregator.remove_by_key(&shown.key);
        assert!(aggregator.is_empty());
    }

    #[test]
    fn notifier_panic_is_contained() {
        let aggregator = ErrorAggregator::new(
            Arc::new(FakeClock::new()),
            Arc::new(Exploding),
            AggregatorConfig::default(),
        );

        let shown = aggregator.record(&payload("boom", Severity::High));

        assert!(shown.is_some());
        assert_eq!(aggregator.len(), 1);
    }

    #[test]
    fn attached_aggregator_receives_bus_events() {
        let (_, recorder, aggregator) = setup();
        let aggregator = Arc::new(aggregator);
        let bus = EventBus::new();
        let sub = aggregator.attach(&bus);

        bus.emit_api_error(&payload("via bus", Severity::High));
        sub.unsubscribe();
        bus.emit_api_error(&payload("via bus", Severity::High));

        assert_eq!(recorder.shown.lock().len(), 1);
    }
}
