//! In-process publish/subscribe for API events.
//!
//! Two channels exist: `api-error`, carrying [`ApiErrorPayload`], and
//! `api-config-updated`, carrying the new [`ApiConfig`]. Emission is
//! synchronous: every handler registered at emit time runs, in
//! registration order, before `emit` returns. Nothing is buffered, so a
//! handler registered after an emission never sees it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use walletlink_domain::{ApiConfig, ApiErrorPayload};

/// Name of the error channel.
pub const API_ERROR: &str = "api-error";

/// Name of the config channel.
pub const API_CONFIG_UPDATED: &str = "api-config-updated";

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;
type HandlerList<T> = Mutex<Vec<(u64, Handler<T>)>>;

/// A single named channel with its ordered subscriber list.
pub struct Channel<T> {
    name: &'static str,
    next_id: AtomicU64,
    handlers: Arc<HandlerList<T>>,
}

impl<T: 'static> Channel<T> {
    /// Creates an empty channel.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(0),
            handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the channel name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Registers a handler. It stays registered until the returned
    /// subscription is revoked.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().push((id, Arc::new(handler)));

        let handlers: Weak<HandlerList<T>> = Arc::downgrade(&self.handlers);
        Subscription::new(move || {
            if let Some(handlers) = handlers.upgrade() {
                handlers.lock().retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Dispatches `payload` to every current subscriber and returns how
    /// many were invoked.
    ///
    /// Each handler runs inside its own panic boundary; a panicking handler
    /// is logged and the rest still run. The subscriber list is snapshotted
    /// first, so handlers may subscribe, unsubscribe or emit re-entrantly.
    pub fn emit(&self, payload: &T) -> usize {
        let snapshot: Vec<Handler<T>> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
                tracing::warn!(channel = self.name, "event handler panicked");
            }
        }
        snapshot.len()
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

/// Revocation handle returned by [`Channel::subscribe`].
///
/// Revoking is idempotent. Dropping the handle does not revoke.
#[must_use = "dropping a Subscription leaves the handler registered with no way to remove it"]
pub struct Subscription {
    revoke: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(revoke: impl FnOnce() + Send + 'static) -> Self {
        Self {
            revoke: Mutex::new(Some(Box::new(revoke))),
        }
    }

    /// Removes the handler. Calling this more than once does nothing.
    pub fn unsubscribe(&self) {
        let revoke = self.revoke.lock().take();
        if let Some(revoke) = revoke {
            revoke();
        }
    }

    /// Returns true while the handler is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.revoke.lock().is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// The two API channels.
pub struct EventBus {
    api_error: Channel<ApiErrorPayload>,
    config_updated: Channel<ApiConfig>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_error: Channel::new(API_ERROR),
            config_updated: Channel::new(API_CONFIG_UPDATED),
        }
    }

    /// Returns the process-wide bus.
    ///
    /// Components take an injected `Arc<EventBus>`; this instance is what
    /// the binary injects.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<EventBus>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// The `api-error` channel.
    #[must_use]
    pub const fn api_error(&self) -> &Channel<ApiErrorPayload> {
        &self.api_error
    }

    /// The `api-config-updated` channel.
    #[must_use]
    pub const fn config_updated(&self) -> &Channel<ApiConfig> {
        &self.config_updated
    }

    /// Publishes a failure to be surfaced.
    pub fn emit_api_error(&self, payload: &ApiErrorPayload) -> usize {
        self.api_error.emit(payload)
    }

    /// Publishes a configuration change.
    pub fn emit_config_updated(&self, config: &ApiConfig) -> usize {
        self.config_updated.emit(config)
    }

    /// Subscribes to `api-error`.
    pub fn on_api_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ApiErrorPayload) + Send + Sync + 'static,
    {
        self.api_error.subscribe(handler)
    }

    /// Subscribes to `api-config-updated`.
    pub fn on_config_updated<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ApiConfig) + Send + Sync + 'static,
    {
        self.config_updated.subscribe(handler)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
