//! Resolution of the persisted client settings.
//!
//! Lookup order for the base URL: canonical key, legacy alias, the
//! environment-provided URL, then [`DEFAULT_BASE_URL`]. The API key and the
//! simulated-backend flag follow the same canonical-then-legacy rule.

use walletlink_domain::{ApiConfig, DEFAULT_BASE_URL, settings_keys};

use crate::ports::{SettingsError, SettingsStore};

/// Settings the access layer is started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Connection config for the transport client.
    pub api: ApiConfig,
    /// Whether the simulated backend replaces the real API.
    pub use_mock: bool,
}

impl ClientSettings {
    /// Loads settings from `store`, falling back to `env_base_url` and then
    /// the literal default for the base URL.
    ///
    /// A stored base URL that fails validation is ignored with a warning
    /// rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load<S>(store: &S, env_base_url: Option<String>) -> Result<Self, SettingsError>
    where
        S: SettingsStore + ?Sized,
    {
        let stored_url = store
            .get_with_alias(settings_keys::BASE_URL, settings_keys::LEGACY_BASE_URL)
            .await?
            .filter(|url| {
                let valid = walletlink_domain::validate_base_url(url).is_ok();
                if !valid {
                    tracing::warn!(%url, "ignoring invalid stored base URL");
                }
                valid
            });

        let base_url = stored_url
            .or_else(|| env_base_url.filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut api = ApiConfig::new(base_url.trim());
        if let Some(key) = store
            .get_with_alias(settings_keys::API_KEY, settings_keys::LEGACY_API_KEY)
            .await?
        {
            api = api.with_api_key(key);
        }

        let use_mock = store
            .get(settings_keys::USE_MOCK)
            .await?
            .is_some_and(|flag| parse_flag(&flag));

        Ok(Self { api, use_mock })
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
