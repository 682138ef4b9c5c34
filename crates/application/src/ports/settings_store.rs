//! Settings store port
//!
//! Durable key/value storage for the persisted API settings.

use async_trait::async_trait;

/// Errors that can occur during settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No location is available to store settings in.
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Repository trait for persisted settings.
///
/// Keys are the logical names from `walletlink_domain::settings_keys`;
/// values are plain strings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads a value, returning `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    /// Writes a value.
    ///
    /// # Errors
    /// Returns an error if the value cannot be persisted.
    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;

    /// Removes a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), SettingsError>;

    /// Reads `key`, falling back to `legacy` when the canonical key is absent.
    async fn get_with_alias(
        &self,
        key: &str,
        legacy: &str,
    ) -> Result<Option<String>, SettingsError> {
        match self.get(key).await? {
            Some(value) => Ok(Some(value)),
            None => self.get(legacy).await,
        }
    }
}
