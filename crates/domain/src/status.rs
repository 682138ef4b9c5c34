//! API reachability status shown by the UI.

use serde::{Deserialize, Serialize};

/// Finite state owned by the status poller.
///
/// - `Checking`: a probe is in flight and the previous result was not an error
/// - `Ok`: the last probe succeeded
/// - `Error`: the last probe failed
/// - `Mock`: the simulated backend is in use and no probes run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    /// The last probe succeeded.
    Ok,
    /// The last probe failed.
    Error,
    /// A probe is in flight.
    #[default]
    Checking,
    /// Probing is disabled because the simulated backend is active.
    Mock,
}

impl ApiStatus {
    /// Returns a color category for UI display.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Ok => "green",
            Self::Error => "red",
            Self::Checking => "yellow",
            Self::Mock => "blue",
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Checking => "checking",
            Self::Mock => "mock",
        };
        f.write_str(label)
    }
}
