//! API configuration model
//!
//! `ApiConfig` is the single piece of cross-cutting mutable state in the
//! access layer. The keys under which it is persisted live in
//! [`settings_keys`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};

/// Base URL used when neither settings nor environment provide one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// Environment variable consulted before [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "WALLETLINK_API_URL";

/// Logical names of persisted settings.
pub mod settings_keys {
    /// Canonical key for the API base URL.
    pub const BASE_URL: &str = "api.baseUrl";
    /// Legacy alias for [`BASE_URL`].
    pub const LEGACY_BASE_URL: &str = "api_url";
    /// Canonical key for the API key.
    pub const API_KEY: &str = "api.key";
    /// Legacy alias for [`API_KEY`].
    pub const LEGACY_API_KEY: &str = "api_key";
    /// Boolean flag selecting the simulated backend.
    pub const USE_MOCK: &str = "api.useMock";
}

/// Connection settings read by every outgoing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Base URL all request paths are resolved against.
    pub base_url: String,
    /// Key sent verbatim in the `Authorization` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ApiConfig {
    /// Creates a config without an API key.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Sets the API key. Empty keys are stored as `None`.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.trim().is_empty()).then_some(key);
        self
    }

    /// Validates the base URL and the API key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the base URL is not an absolute http(s) URL,
    /// or `InvalidApiKey` if the key contains control characters.
    pub fn validate(&self) -> DomainResult<()> {
        validate_base_url(&self.base_url)?;
        self.api_key.as_deref().map_or(Ok(()), validate_api_key)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Checks that `raw` is an absolute http or https URL.
///
/// # Errors
///
/// Returns `InvalidUrl` describing the problem.
pub fn validate_base_url(raw: &str) -> DomainResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| DomainError::InvalidUrl(format!("{e}: {raw}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DomainError::InvalidUrl(format!(
            "unsupported scheme '{other}': {raw}"
        ))),
    }
}

/// Checks that `key` can travel in an `Authorization` header.
///
/// # Errors
///
/// Returns `InvalidApiKey` if the key contains control characters.
pub fn validate_api_key(key: &str) -> DomainResult<()> {
    if key.chars().any(char::is_control) {
        return Err(DomainError::InvalidApiKey(
            "key contains control characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_uses_literal_url() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn blank_api_key_is_none() {
        let config = ApiConfig::new("http://wallet.test").with_api_key("  ");
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn validate_rejects_non_http_scheme() {
        let config = ApiConfig::new("ftp://wallet.test");
        assert!(matches!(config.validate(), Err(DomainError::InvalidUrl(_))));
    }

    #[test]
    fn validate_rejects_relative_url() {
        assert!(validate_base_url("/api").is_err());
        assert!(validate_base_url("https://wallet.test/api").is_ok());
    }

    #[test]
    fn api_key_with_line_break_is_rejected() {
        assert!(validate_api_key("k-123").is_ok());
        assert!(matches!(
            validate_api_key("a\nb"),
            Err(DomainError::InvalidApiKey(_))
        ));
    }

    #[test]
    fn serializes_camel_case() {
        let config = ApiConfig::new("http://wallet.test").with_api_key("k-1");
        let json = serde_json::to_value(&config).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({"baseUrl": "http://wallet.test", "apiKey": "k-1"})
        );
    }
}
