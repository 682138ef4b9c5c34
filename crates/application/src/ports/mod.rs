//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the access layer and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod clock;
mod health;
mod notifier;
mod settings_store;
mod transport;

pub use clock::Clock;
pub use health::HealthProbe;
pub use notifier::Notifier;
pub use settings_store::{SettingsError, SettingsStore};
pub use transport::{
    CancellationReceiver, CancellationToken, HttpRequest, HttpResponse, HttpTransport,
    TransportFailure,
};
