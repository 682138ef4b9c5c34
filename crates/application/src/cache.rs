//! Keyed TTL cache for fetch results.
//!
//! Expiry is lazy: an entry is live while `now < expires_at` and is only
//! dropped when it is read after that or explicitly invalidated. Failed
//! fetches are never stored. Concurrent misses on the same key are not
//! coalesced; each caller runs its own fetch and the last one to finish
//! wins the slot.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::event_bus::{EventBus, Subscription};
use crate::ports::Clock;

/// Prefix of the wallet balance keys flushed on config changes.
pub const BALANCE_PREFIX: &str = "balance|";

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: DateTime<Utc>,
}

/// Cache shared across value types.
pub struct TtlCache {
    clock: Arc<dyn Clock>,
    store: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    /// Creates an empty cache.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live value for `key`, or runs `fetcher` and stores its
    /// result for `ttl` if it succeeds.
    ///
    /// An entry holding a different type than `T` counts as a miss.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error unchanged. Nothing is cached in that
    /// case.
    pub async fn with_ttl_cache<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.lookup::<T>(key) {
            tracing::trace!(key, "cache hit");
            return Ok(value);
        }

        tracing::trace!(key, "cache miss");
        let value = fetcher().await?;

        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.store.lock().insert(
            key.to_string(),
            CacheEntry {
                value: Arc::new(value.clone()),
                expires_at,
            },
        );
        Ok(value)
    }

    fn lookup<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut store = self.store.lock();
        let expired = now >= store.get(key)?.expires_at;
        if expired {
            store.remove(key);
            return None;
        }
        store.get(key)?.value.downcast_ref::<T>().cloned()
    }

    /// Drops the entry for `key`.
    pub fn invalidate(&self, key: &str) {
        self.store.lock().remove(key);
    }

    /// Drops every entry whose key starts with `prefix`.
    pub fn invalidate_by_prefix(&self, prefix: &str) {
        let mut store = self.store.lock();
        let before = store.len();
        store.retain(|key, _| !key.starts_with(prefix));
        tracing::debug!(prefix, dropped = before - store.len(), "cache prefix invalidated");
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Flushes `prefix` whenever `api-config-updated` fires, since cached
    /// values may belong to the previous backend.
    pub fn invalidate_on_config_change(self: &Arc<Self>, bus: &EventBus, prefix: impl Into<String>) -> Subscription {
        let prefix = prefix.into();
        let weak: Weak<Self> = Arc::downgrade(self);
        bus.on_config_updated(move |_| {
            if let Some(cache) = weak.upgrade() {
                cache.invalidate_by_prefix(&prefix);
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::FakeClock;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use walletlink_domain::ApiConfig;

    fn cache() -> (Arc<FakeClock>, Arc<TtlCache>) {
        let clock = Arc::new(FakeClock::new());
        let cache = Arc::new(TtlCache::new(Arc::clone(&clock) as Arc<dyn Clock>));
        (clock, cache)
    }

    async fn counted(calls: &AtomicUsize, value: u64) -> Result<u64, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn live_entry_skips_fetcher() {
        let (clock, cache) = cache();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_millis(100);

        let first = cache.with_ttl_cache("balance|w1", ttl, || counted(&calls, 10)).await;
        clock.advance(Duration::from_millis(50));
        let second = cache.with_ttl_cache("balance|w1", ttl, || counted(&calls, 20)).await;

        assert_eq!(first, Ok(10));
        assert_eq!(second, Ok(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let (clock, cache) = cache();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_millis(100);

        cache.with_ttl_cache("balance|w1", ttl, || counted(&calls, 10)).await.unwrap();
        clock.advance(Duration::from_millis(150));
        let value = cache.with_ttl_cache("balance|w1", ttl, || counted(&calls, 20)).await;

        assert_eq!(value, Ok(20));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expiry_boundary_is_exclusive() {
        let (clock, cache) = cache();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_millis(100);

        cache.with_ttl_cache("k", ttl, || counted(&calls, 1)).await.unwrap();
        clock.advance(Duration::from_millis(100));
        cache.with_ttl_cache("k", ttl, || counted(&calls, 2)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (_, cache) = cache();
        let ttl = Duration::from_secs(60);

        let failed: Result<u64, String> = cache
            .with_ttl_cache("balance|w1", ttl, || async { Err("offline".to_string()) })
            .await;
        assert_eq!(failed, Err("offline".to_string()));
        assert!(cache.is_empty());

        let value = cache
            .with_ttl_cache("balance|w1", ttl, || async { Ok::<_, String>(7_u64) })
            .await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn type_mismatch_is_a_miss() {
        let (_, cache) = cache();
        let ttl = Duration::from_secs(60);

        cache.with_ttl_cache("k", ttl, || async { Ok::<_, String>(1_u64) }).await.unwrap();
        let text = cache
            .with_ttl_cache("k", ttl, || async { Ok::<_, String>("one".to_string()) })
            .await;

        assert_eq!(text, Ok("one".to_string()));
    }

    #[tokio::test]
    async fn overlapping_misses_both_fetch() {
        let (_, cache) = cache();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(60);
        let slow = |value: u64| {
            let calls = &calls;
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok::<_, String>(value)
            }
        };

        let (a, b) = tokio::join!(
            cache.with_ttl_cache("k", ttl, slow(1)),
            cache.with_ttl_cache("k", ttl, slow(2)),
        );

        assert_eq!((a, b), (Ok(1), Ok(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prefix_invalidation() {
        let (_, cache) = cache();
        let ttl = Duration::from_secs(60);
        for key in ["balance|w1", "balance|w2", "fees|btc"] {
            cache.with_ttl_cache(key, ttl, || async { Ok::<_, String>(0_u64) }).await.unwrap();
        }

        cache.invalidate_by_prefix(BALANCE_PREFIX);
        assert_eq!(cache.len(), 1);

        cache.invalidate("fees|btc");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn config_change_flushes_balances() {
        let (_, cache) = cache();
        let bus = EventBus::new();
        let sub = cache.invalidate_on_config_change(&bus, BALANCE_PREFIX);
        let ttl = Duration::from_secs(60);
        for key in ["balance|w1", "fees|btc"] {
            cache.with_ttl_cache(key, ttl, || async { Ok::<_, String>(0_u64) }).await.unwrap();
        }

        bus.emit_config_updated(&ApiConfig::new("https://other.test"));

        assert_eq!(cache.len(), 1);
        sub.unsubscribe();
        cache.clear();
        assert!(cache.is_empty());
    }
}
