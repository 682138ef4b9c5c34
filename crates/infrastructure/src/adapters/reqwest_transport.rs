//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. It reports every
//! received response as `Ok`, whatever the status, and maps the failures
//! where no response arrived onto `TransportFailure`.

use std::time::Duration;

use reqwest::{Client, Method, Url};
use walletlink_application::ports::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};
use walletlink_domain::HttpMethod;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("Walletlink/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// Default configuration:
    /// - Connect timeout: 10 seconds
    /// - Follow redirects: up to 10
    /// - TLS verification: enabled
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> Result<Self, TransportFailure> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| TransportFailure::InvalidRequest(e.to_string()))?;

        Ok(Self { client })
    }

    /// Creates a transport around an existing reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Maps reqwest errors onto transport failures.
    fn map_error(error: &reqwest::Error, timeout_ms: u64) -> TransportFailure {
        if error.is_timeout() {
            return TransportFailure::Timeout { timeout_ms };
        }

        if error.is_builder() {
            return TransportFailure::InvalidRequest(error.to_string());
        }

        if error.is_connect() {
            let host = error
                .url()
                .and_then(Url::host_str)
                .unwrap_or("unknown")
                .to_string();
            return TransportFailure::Network(format!("could not connect to {host}: {error}"));
        }

        if error.is_redirect() {
            return TransportFailure::Network(format!("too many redirects: {error}"));
        }

        TransportFailure::Network(error.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let timeout_ms = u64::try_from(request.timeout.as_millis()).unwrap_or(u64::MAX);
        let url = Url::parse(&request.url)
            .map_err(|e| TransportFailure::InvalidRequest(format!("{e}: {}", request.url)))?;

        let mut builder = self
            .client
            .request(Self::to_reqwest_method(request.method), url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, timeout_ms))?
            .to_vec();

        tracing::trace!(method = %request.method, url = %request.url, status, "response received");
        Ok(HttpResponse { status, body })
    }
}
