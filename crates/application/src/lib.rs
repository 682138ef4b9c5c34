//! Walletlink Application - Resilient API access layer
//!
//! This crate holds the behavior of the access layer:
//! - Port traits (transport, settings, clock, notifications, health)
//! - Error classification and the API event bus
//! - The transport client, status poller, error aggregator and TTL cache

pub mod aggregator;
pub mod cache;
pub mod classifier;
pub mod client;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod normalize;
pub mod poller;
pub mod ports;

#[cfg(test)]
mod test_support;

pub use aggregator::{AggregatorConfig, ErrorAggregator};
pub use cache::{BALANCE_PREFIX, TtlCache};
pub use classifier::{ResolvedEndpoint, classify, resolve_endpoint};
pub use client::{ApiClient, DEFAULT_TIMEOUT, HEALTH_PATH, HEALTH_TIMEOUT, RequestOptions};
pub use config::ClientSettings;
pub use error::{ApiError, ApplicationError, ApplicationResult};
pub use event_bus::{API_CONFIG_UPDATED, API_ERROR, Channel, EventBus, Subscription};
pub use poller::{PollerConfig, StatusPoller};
pub use ports::{
    CancellationReceiver, CancellationToken, Clock, HealthProbe, HttpRequest, HttpResponse,
    HttpTransport, Notifier, SettingsError, SettingsStore, TransportFailure,
};
