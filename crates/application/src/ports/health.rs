//! Health probe port used by the status poller.

use std::future::Future;

use walletlink_domain::ClassifiedError;

/// Port for checking whether the wallet API is reachable.
pub trait HealthProbe: Send + Sync {
    /// Runs one probe.
    ///
    /// # Errors
    ///
    /// Returns the classification of the failed probe.
    fn probe(&self) -> impl Future<Output = Result<(), ClassifiedError>> + Send;
}
