//! Transport client for the wallet API.
//!
//! [`ApiClient`] owns the [`ApiConfig`], builds every request from the
//! config current at send time, classifies failures, retries once where
//! safe, and publishes final failures on the event bus.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use walletlink_domain::{
    ApiConfig, ApiErrorPayload, ClassifiedError, ErrorCategory, HttpMethod, RequestDescriptor,
    settings_keys, validate_api_key, validate_base_url,
};

use crate::classifier::classify;
use crate::error::{ApiError, ApplicationResult};
use crate::event_bus::{EventBus, Subscription};
use crate::ports::{
    CancellationToken, Clock, HealthProbe, HttpRequest, HttpResponse, HttpTransport,
    SettingsStore, TransportFailure,
};

/// Timeout applied when a request does not set its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout of the health probe.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the client's default timeout.
    pub timeout: Option<Duration>,
    /// Aborts the call when cancelled.
    pub cancel: Option<CancellationToken>,
    /// Do not publish a final failure on the event bus.
    pub silent: bool,
    /// Never retry, even when the failure qualifies.
    pub no_retry: bool,
}

impl RequestOptions {
    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Suppresses the `api-error` event for this call.
    #[must_use]
    pub const fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Disables the retry for this call.
    #[must_use]
    pub const fn without_retry(mut self) -> Self {
        self.no_retry = true;
        self
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// HTTP client wrapper with classification, one-shot retry and
/// config broadcasting.
pub struct ApiClient<T: HttpTransport, S: SettingsStore> {
    transport: T,
    settings: Arc<S>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    config: Arc<RwLock<ApiConfig>>,
    config_subscription: Subscription,
    default_timeout: Duration,
}

impl<T: HttpTransport, S: SettingsStore> ApiClient<T, S> {
    /// Creates a client and subscribes it to `api-config-updated`, so
    /// config changes made elsewhere reach its in-memory copy.
    pub fn new(
        transport: T,
        settings: Arc<S>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        config: ApiConfig,
    ) -> Self {
        let config = Arc::new(RwLock::new(config));
        let weak = Arc::downgrade(&config);
        let config_subscription = bus.on_config_updated(move |update| {
            let Some(config) = weak.upgrade() else {
                return;
            };
            let mut current = config.write();
            if *current != *update {
                tracing::info!(base_url = %update.base_url, "API config updated externally");
                *current = update.clone();
            }
        });

        Self {
            transport,
            settings,
            bus,
            clock,
            config,
            config_subscription,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the timeout used by calls that do not set their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns a copy of the current config.
    #[must_use]
    pub fn config(&self) -> ApiConfig {
        self.config.read().clone()
    }

    /// Returns the current base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.config.read().base_url.clone()
    }

    /// Returns the current API key.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.config.read().api_key.clone()
    }

    /// Validates and persists a new base URL, swaps it in, and broadcasts
    /// the new config.
    ///
    /// # Errors
    ///
    /// Returns a domain error for an invalid URL or a settings error if it
    /// cannot be persisted; the in-memory config is unchanged on error.
    pub async fn set_base_url(&self, url: &str) -> ApplicationResult<()> {
        let url = url.trim();
        validate_base_url(url)?;
        self.settings.set(settings_keys::BASE_URL, url).await?;
        let updated = {
            let mut config = self.config.write();
            config.base_url = url.to_string();
            config.clone()
        };
        self.broadcast(&updated);
        Ok(())
    }

    /// Persists a new API key (or removes it), swaps it in, and broadcasts
    /// the new config.
    ///
    /// # Errors
    ///
    /// Returns a domain error if the key contains control characters or a
    /// settings error if it cannot be persisted; the in-memory config is
    /// unchanged on error.
    pub async fn set_api_key(&self, key: Option<&str>) -> ApplicationResult<()> {
        let key = key.map(str::trim).filter(|k| !k.is_empty());
        if let Some(key) = key {
            validate_api_key(key)?;
        }
        match key {
            Some(key) => self.settings.set(settings_keys::API_KEY, key).await?,
            None => self.settings.remove(settings_keys::API_KEY).await?,
        }
        let updated = {
            let mut config = self.config.write();
            config.api_key = key.map(str::to_string);
            config.clone()
        };
        self.broadcast(&updated);
        Ok(())
    }

    /// Replaces the whole config.
    ///
    /// # Errors
    ///
    /// Returns a domain error for an invalid config or a settings error if
    /// it cannot be persisted.
    pub async fn update_config(&self, config: ApiConfig) -> ApplicationResult<()> {
        config.validate()?;
        self.settings
            .set(settings_keys::BASE_URL, &config.base_url)
            .await?;
        match &config.api_key {
            Some(key) => self.settings.set(settings_keys::API_KEY, key).await?,
            None => self.settings.remove(settings_keys::API_KEY).await?,
        }
        *self.config.write() = config.clone();
        self.broadcast(&config);
        Ok(())
    }

    fn broadcast(&self, config: &ApiConfig) {
        tracing::info!(base_url = %config.base_url, "API config changed");
        self.bus.emit_config_updated(config);
    }

    /// Sends a request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the last attempt.
    pub async fn request<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> Result<R, ApiError> {
        let mut descriptor = RequestDescriptor::new(method, path);
        descriptor.body = body;
        self.send(descriptor, &options).await
    }

    /// `GET` convenience wrapper.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(HttpMethod::Get, path, None, RequestOptions::default())
            .await
    }

    /// `POST` convenience wrapper.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post<R: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<R, ApiError> {
        self.request(HttpMethod::Post, path, Some(body), RequestOptions::default())
            .await
    }

    /// `PUT` convenience wrapper.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn put<R: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<R, ApiError> {
        self.request(HttpMethod::Put, path, Some(body), RequestOptions::default())
            .await
    }

    /// `DELETE` convenience wrapper.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(HttpMethod::Delete, path, None, RequestOptions::default())
            .await
    }

    /// Sends a prepared descriptor.
    ///
    /// # Errors
    ///
    /// Returns the classified failure of the last attempt.
    pub async fn send<R: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
        options: &RequestOptions,
    ) -> Result<R, ApiError> {
        let mut current = descriptor;
        loop {
            let failure = match self.attempt(&current, options).await {
                Ok(response) => match decode(&response) {
                    Ok(value) => return Ok(value),
                    Err(failure) => failure,
                },
                Err(failure) => failure,
            };

            let classified = classify(&failure, &current);
            if should_retry(&current, &classified, options) {
                tracing::debug!(
                    method = %current.method,
                    path = %current.path,
                    category = %classified.category,
                    "retrying request once"
                );
                current = current.as_retry();
                continue;
            }
            return Err(self.fail(classified, &current, options));
        }
    }

    async fn attempt(
        &self,
        descriptor: &RequestDescriptor,
        options: &RequestOptions,
    ) -> Result<HttpResponse, TransportFailure> {
        if options.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(TransportFailure::Canceled);
        }

        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let request = self.build_request(descriptor, timeout)?;
        let exchange = tokio::time::timeout(timeout, self.transport.execute(&request));

        let outcome = match &options.cancel {
            Some(token) => {
                let mut cancelled = token.receiver();
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => return Err(TransportFailure::Canceled),
                    outcome = exchange => outcome,
                }
            }
            None => exchange.await,
        };

        let response = outcome.map_err(|_| TransportFailure::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })??;

        if response.is_success() {
            Ok(response)
        } else {
            Err(TransportFailure::Status {
                status: response.status,
                body: response.text(),
            })
        }
    }

    /// Resolves a descriptor against the config as it is right now.
    fn build_request(
        &self,
        descriptor: &RequestDescriptor,
        timeout: Duration,
    ) -> Result<HttpRequest, TransportFailure> {
        let config = self.config();

        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if let Some(key) = config.api_key {
            headers.push(("Authorization".to_string(), key));
        }

        let body = descriptor
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| TransportFailure::InvalidRequest(e.to_string()))?;

        Ok(HttpRequest {
            method: descriptor.method,
            url: descriptor.url_for(&config.base_url),
            headers,
            body,
            timeout,
        })
    }

    fn fail(
        &self,
        classified: ClassifiedError,
        descriptor: &RequestDescriptor,
        options: &RequestOptions,
    ) -> ApiError {
        if classified.category == ErrorCategory::Canceled {
            tracing::debug!(path = %descriptor.path, "request canceled");
        } else {
            tracing::warn!(
                method = %descriptor.method,
                path = %descriptor.path,
                category = %classified.category,
                status = ?classified.status,
                "request failed"
            );
            if !options.silent {
                let payload = ApiErrorPayload::from_classified(
                    classified.clone(),
                    descriptor,
                    self.clock.now(),
                );
                self.bus.emit_api_error(&payload);
            }
        }
        ApiError::new(classified)
    }
}

impl<T: HttpTransport, S: SettingsStore> Drop for ApiClient<T, S> {
    fn drop(&mut self) {
        self.config_subscription.unsubscribe();
    }
}

impl<T: HttpTransport, S: SettingsStore> HealthProbe for ApiClient<T, S> {
    async fn probe(&self) -> Result<(), ClassifiedError> {
        let descriptor = RequestDescriptor::get(HEALTH_PATH);
        let options = RequestOptions::default()
            .with_timeout(HEALTH_TIMEOUT)
            .without_retry()
            .silent();

        let health: HealthResponse = self
            .send(descriptor.clone(), &options)
            .await
            .map_err(ApiError::into_classified)?;

        if health.status == "ok" {
            Ok(())
        } else {
            let failure = TransportFailure::InvalidResponse(format!(
                "health status is '{}'",
                health.status
            ));
            Err(classify(&failure, &descriptor))
        }
    }
}

/// Retry at most once. Idempotent reads retry on any retryable category;
/// mutations only when the server cannot have processed them.
fn should_retry(
    descriptor: &RequestDescriptor,
    classified: &ClassifiedError,
    options: &RequestOptions,
) -> bool {
    if descriptor.retried || options.no_retry || !classified.is_retryable {
        return false;
    }
    descriptor.method.is_idempotent()
        || matches!(
            classified.category,
            ErrorCategory::Network | ErrorCategory::Timeout
        )
}

fn decode<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, TransportFailure> {
    let body: &[u8] = if response.body.is_empty() {
        b"null"
    } else {
        &response.body
    };
    serde_json::from_slice(body).map_err(|e| TransportFailure::InvalidResponse(e.to_string()))
}
