//! Adapter implementations of the application ports.

mod reqwest_transport;
mod scripted_transport;
mod system_clock;
mod tracing_notifier;

pub use reqwest_transport::{ReqwestTransport, USER_AGENT};
pub use scripted_transport::ScriptedTransport;
pub use system_clock::{ManualClock, SystemClock};
pub use tracing_notifier::TracingNotifier;
