//! Adaptive API status poller.
//!
//! Probes the API health endpoint on a schedule: every 15s while healthy,
//! backing off exponentially (capped at 60s, with ±15% jitter) while
//! failing. Probing pauses while the page is hidden and stops entirely in
//! mock mode.
//!
//! Every probe takes a sequence number when issued. A result is applied
//! only if its number is still the latest, so a slow probe that has been
//! superseded (say, by a visibility change) cannot overwrite a newer
//! result.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use walletlink_domain::ApiStatus;

use crate::event_bus::{EventBus, Subscription};
use crate::ports::HealthProbe;

/// Scheduling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollerConfig {
    /// Delay after a successful probe, and the starting point for backoff.
    pub floor: Duration,
    /// Upper bound of the backoff delay before jitter.
    pub cap: Duration,
    /// Multiplicative jitter applied to failure delays, e.g. `0.15`.
    pub jitter: f64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            floor: Duration::from_secs(15),
            cap: Duration::from_secs(60),
            jitter: 0.15,
        }
    }
}

/// Doubles `current`, capped at `cap`.
#[must_use]
pub fn next_backoff(current: Duration, cap: Duration) -> Duration {
    current.saturating_mul(2).min(cap)
}

/// Scales `delay` by a factor drawn uniformly from `[1 - jitter, 1 + jitter]`.
#[must_use]
pub fn jittered(delay: Duration, jitter: f64) -> Duration {
    let jitter = jitter.clamp(0.0, 1.0);
    let factor = 1.0 + rand::rng().random_range(-jitter..=jitter);
    delay.mul_f64(factor)
}

struct PollerState {
    status: ApiStatus,
    sequence: u64,
    current_delay: Duration,
    next_delay: Option<Duration>,
    timer: Option<JoinHandle<()>>,
    running: bool,
    visible: bool,
    mock: bool,
    subscription: Option<Subscription>,
    runtime: Option<Handle>,
}

impl PollerState {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Inner<P> {
    probe: Arc<P>,
    config: PollerConfig,
    state: Mutex<PollerState>,
    status_tx: watch::Sender<ApiStatus>,
}

impl<P> Inner<P> {
    fn set_status(&self, state: &mut PollerState, status: ApiStatus) {
        if state.status != status {
            tracing::info!(from = %state.status, to = %status, "API status changed");
            state.status = status;
        }
        self.status_tx.send_replace(status);
    }
}

/// Periodic health prober with backoff, visibility awareness and
/// stale-result rejection.
///
/// Cloning yields another handle to the same poller.
pub struct StatusPoller<P> {
    inner: Arc<Inner<P>>,
    bus: Arc<EventBus>,
}

impl<P> Clone for StatusPoller<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<P: HealthProbe + 'static> StatusPoller<P> {
    /// Creates a stopped poller in the `Checking` state.
    pub fn new(probe: Arc<P>, bus: Arc<EventBus>, config: PollerConfig) -> Self {
        let (status_tx, _) = watch::channel(ApiStatus::Checking);
        let state = PollerState {
            status: ApiStatus::Checking,
            sequence: 0,
            current_delay: config.floor,
            next_delay: None,
            timer: None,
            running: false,
            visible: true,
            mock: false,
            subscription: None,
            runtime: None,
        };
        Self {
            inner: Arc::new(Inner {
                probe,
                config,
                state: Mutex::new(state),
                status_tx,
            }),
            bus,
        }
    }

    /// Starts polling: probes immediately (unless in mock mode) and
    /// re-probes whenever `api-config-updated` fires. Must be called from
    /// within a tokio runtime. Starting a running poller does nothing.
    pub fn start(&self) {
        let weak = Arc::downgrade(&self.inner);
        let subscription = self.bus.on_config_updated(move |_| {
            if let Some(inner) = weak.upgrade() {
                tracing::debug!("config changed, re-probing");
                spawn_probe(&inner);
            }
        });

        let mut state = self.inner.state.lock();
        if state.running {
            drop(state);
            subscription.unsubscribe();
            return;
        }
        state.running = true;
        state.runtime = Handle::try_current().ok();
        state.subscription = Some(subscription);
        let probe_now = !state.mock && state.visible;
        drop(state);

        if probe_now {
            spawn_probe(&self.inner);
        }
    }

    /// Stops polling: cancels the timer, revokes the config subscription
    /// and invalidates in-flight probes. Safe to call repeatedly.
    pub fn stop(&self) {
        let subscription = {
            let mut state = self.inner.state.lock();
            state.running = false;
            state.sequence += 1;
            state.cancel_timer();
            state.next_delay = None;
            state.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    /// Forces an immediate probe and waits for it. The result is applied
    /// under the same sequencing rule as scheduled probes. Does nothing in
    /// mock mode. On a stopped poller the probe still runs once but
    /// schedules nothing.
    pub async fn refresh(&self) {
        run_probe(Arc::clone(&self.inner), Trigger::Manual).await;
    }

    /// Reports page visibility. Hiding suspends the timer; becoming
    /// visible again probes immediately.
    pub fn set_visible(&self, visible: bool) {
        let mut state = self.inner.state.lock();
        if state.visible == visible {
            return;
        }
        state.visible = visible;
        if visible {
            let probe_now = state.running && !state.mock;
            drop(state);
            if probe_now {
                spawn_probe(&self.inner);
            }
        } else {
            tracing::debug!("page hidden, suspending status polling");
            state.cancel_timer();
        }
    }

    /// Switches mock mode. Entering it reports `Mock` and stops probing;
    /// leaving it probes immediately.
    pub fn set_mock(&self, mock: bool) {
        let mut state = self.inner.state.lock();
        if state.mock == mock {
            return;
        }
        state.mock = mock;
        if mock {
            state.sequence += 1;
            state.cancel_timer();
            state.next_delay = None;
            self.inner.set_status(&mut state, ApiStatus::Mock);
        } else {
            state.current_delay = self.inner.config.floor;
            self.inner.set_status(&mut state, ApiStatus::Checking);
            let probe_now = state.running && state.visible;
            drop(state);
            if probe_now {
                spawn_probe(&self.inner);
            }
        }
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ApiStatus {
        self.inner.state.lock().status
    }

    /// Returns a receiver that observes every status change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ApiStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Returns the delay of the most recently scheduled probe.
    #[must_use]
    pub fn next_delay(&self) -> Option<Duration> {
        self.inner.state.lock().next_delay
    }

    /// Returns the un-jittered backoff delay.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.inner.state.lock().current_delay
    }

    /// Returns true between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }
}

fn spawn_probe<P: HealthProbe + 'static>(inner: &Arc<Inner<P>>) {
    let runtime = inner.state.lock().runtime.clone();
    let task = run_probe(Arc::clone(inner), Trigger::Scheduled);
    match runtime.or_else(|| Handle::try_current().ok()) {
        Some(runtime) => {
            runtime.spawn(task);
        }
        None => tracing::warn!("no tokio runtime available, probe skipped"),
    }
}

/// Where a probe came from. Scheduled probes are dropped once the poller
/// has stopped, even if they were queued before `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Scheduled,
    Manual,
}

async fn run_probe<P: HealthProbe + 'static>(inner: Arc<Inner<P>>, trigger: Trigger) {
    let sequence = {
        let mut state = inner.state.lock();
        if state.mock || (trigger == Trigger::Scheduled && !state.running) {
            return;
        }
        state.sequence += 1;
        state.cancel_timer();
        if state.status != ApiStatus::Error {
            inner.set_status(&mut state, ApiStatus::Checking);
        }
        state.sequence
    };

    let result = inner.probe.probe().await;

    let mut state = inner.state.lock();
    if sequence != state.sequence {
        tracing::debug!(sequence, latest = state.sequence, "discarding stale probe result");
        return;
    }

    let delay = match result {
        Ok(()) => {
            inner.set_status(&mut state, ApiStatus::Ok);
            state.current_delay = inner.config.floor;
            inner.config.floor
        }
        Err(error) => {
            inner.set_status(&mut state, ApiStatus::Error);
            state.current_delay = next_backoff(state.current_delay, inner.config.cap);
            let delay = jittered(state.current_delay, inner.config.jitter);
            tracing::debug!(
                category = %error.category,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "health probe failed"
            );
            delay
        }
    };
    state.next_delay = Some(delay);

    if state.running && state.visible {
        let weak = Arc::downgrade(&inner);
        state.timer = Some(tokio::spawn(wait_then_probe(weak, delay)));
    }
}

/// Body of the timer task. The probe runs in its own task so aborting the
/// timer from inside the probe is harmless. Boxed because it and
/// `run_probe` spawn each other.
fn wait_then_probe<P: HealthProbe + 'static>(
    inner: Weak<Inner<P>>,
    delay: Duration,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        tokio::time::sleep(delay).await;
        if let Some(inner) = inner.upgrade() {
            tokio::spawn(run_probe(inner, Trigger::Scheduled));
        }
    })
}
