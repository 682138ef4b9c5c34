//! Walletlink - Main Entry Point
//!
//! Wires the access layer together: settings, transport client, event
//! bus, error aggregator, balance cache and status poller. Then logs API
//! status transitions until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use walletlink_application::ports::{Clock, HttpTransport, Notifier};
use walletlink_application::{
    AggregatorConfig, ApiClient, BALANCE_PREFIX, ClientSettings, ErrorAggregator, EventBus,
    PollerConfig, StatusPoller, TtlCache,
};
use walletlink_domain::BASE_URL_ENV;
use walletlink_infrastructure::{
    FileSettingsStore, ReqwestTransport, ScriptedTransport, SystemClock, TracingNotifier,
};

const WALLETS_TTL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Walletlink v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(FileSettingsStore::new()?);
    tracing::debug!(path = %store.path().display(), "settings file");
    let settings = ClientSettings::load(store.as_ref(), std::env::var(BASE_URL_ENV).ok()).await?;
    tracing::info!(base_url = %settings.api.base_url, mock = settings.use_mock, "settings loaded");

    if settings.use_mock {
        run(ScriptedTransport::new(), store, settings).await
    } else {
        run(ReqwestTransport::new()?, store, settings).await
    }
}

async fn run<T: HttpTransport + 'static>(
    transport: T,
    store: Arc<FileSettingsStore>,
    settings: ClientSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let bus = EventBus::global();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let aggregator = Arc::new(ErrorAggregator::new(
        Arc::clone(&clock),
        notifier,
        AggregatorConfig::default(),
    ));
    let aggregator_sub = aggregator.attach(&bus);

    let cache = Arc::new(TtlCache::new(Arc::clone(&clock)));
    let cache_sub = cache.invalidate_on_config_change(&bus, BALANCE_PREFIX);

    let client = Arc::new(ApiClient::new(
        transport,
        store,
        Arc::clone(&bus),
        clock,
        settings.api,
    ));

    let poller = StatusPoller::new(Arc::clone(&client), Arc::clone(&bus), PollerConfig::default());
    poller.set_mock(settings.use_mock);
    poller.start();

    let wallets = cache
        .with_ttl_cache("wallets", WALLETS_TTL, || {
            client.get::<serde_json::Value>("/wallets")
        })
        .await;
    match wallets {
        Ok(wallets) => tracing::info!(wallets = %wallets, "wallet list loaded"),
        Err(error) => tracing::debug!(%error, "wallet list unavailable at startup"),
    }

    let mut status = poller.watch();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                tracing::info!(status = %current, color = current.color(), "API status");
            }
        }
    }

    tracing::info!("Shutting down");
    poller.stop();
    cache_sub.unsubscribe();
    aggregator_sub.unsubscribe();
    Ok(())
}
