//! HTTP transport port

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use walletlink_domain::HttpMethod;

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: String,
    /// Header name/value pairs in insertion order
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body
    pub body: Option<Vec<u8>>,
    /// Timeout the transport should apply on its own side
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the first header value with the given name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response as received, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns the body as text, if it is valid UTF-8 and not empty.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        if self.body.is_empty() {
            return None;
        }
        String::from_utf8(self.body.clone()).ok()
    }
}

/// Raw failure of a single request attempt, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// The caller aborted the request.
    #[error("request canceled")]
    Canceled,

    /// No response arrived before the client-side timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// No response was received at all.
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived with a non-2xx status.
    #[error("HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: Option<String>,
    },

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A 2xx response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportFailure {
    /// Returns the HTTP status, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Port for sending requests over HTTP.
///
/// Implementations return `Ok` for every received response regardless of
/// status; status handling is the transport client's job.
pub trait HttpTransport: Send + Sync {
    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns `Network` or `Timeout` when no response was received.
    fn execute(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportFailure>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn execute(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportFailure>> + Send {
        (**self).execute(request)
    }
}

/// Handle used by a caller to abort an in-flight request.
///
/// Clones share the same state; cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cancels every request observing this token.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Returns a receiver that resolves when the token is cancelled.
    #[must_use]
    pub fn receiver(&self) -> CancellationReceiver {
        CancellationReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of a [`CancellationToken`].
#[derive(Debug)]
pub struct CancellationReceiver {
    receiver: watch::Receiver<bool>,
}

impl CancellationReceiver {
    /// Resolves once the token is cancelled. Never resolves if every token
    /// clone is dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
