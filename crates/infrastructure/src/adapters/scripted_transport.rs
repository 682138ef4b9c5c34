//! Scripted transport.
//!
//! Plays back a queue of prepared outcomes and records every request it
//! receives. Once the queue is empty it answers with the fallback response.
//! Backs the simulated API and the integration tests.

use std::collections::VecDeque;

use parking_lot::Mutex;
use walletlink_application::ports::{HttpRequest, HttpResponse, HttpTransport, TransportFailure};

enum Scripted {
    Outcome(Result<HttpResponse, TransportFailure>),
    Hang,
}

/// Queue-driven `HttpTransport`.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Scripted>>,
    fallback: HttpResponse,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport whose fallback is `200 {"status":"ok"}`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fallback(HttpResponse::json(200, &serde_json::json!({ "status": "ok" })))
    }

    /// Creates a transport with a custom fallback response.
    #[must_use]
    pub fn with_fallback(fallback: HttpResponse) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Queues a JSON response.
    pub fn respond(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.push(Scripted::Outcome(Ok(HttpResponse::json(status, body))))
    }

    /// Queues a failure with no response.
    pub fn fail(&self, failure: TransportFailure) -> &Self {
        self.push(Scripted::Outcome(Err(failure)))
    }

    /// Queues a request that never answers.
    pub fn hang(&self) -> &Self {
        self.push(Scripted::Hang)
    }

    fn push(&self, step: Scripted) -> &Self {
        self.queue.lock().push_back(step);
        self
    }

    /// Returns a copy of every request received so far.
    #[must_use]
    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().clone()
    }

    /// Returns how many requests were received.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Returns how many queued outcomes are left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.sent.lock().push(request.clone());
        let next = self.queue.lock().pop_front();
        match next {
            Some(Scripted::Outcome(outcome)) => outcome,
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(self.fallback.clone()),
        }
    }
}
