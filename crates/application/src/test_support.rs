//! Test doubles shared by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::ports::{
    Clock, HttpRequest, HttpResponse, HttpTransport, SettingsError, SettingsStore,
    TransportFailure,
};

/// Clock that only moves when told to.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or_default();
        *self.now.lock() += delta;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// In-memory settings.
#[derive(Default)]
pub struct MemoryStore {
    pub values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (key, value) in entries {
            store.values.lock().insert((*key).to_string(), (*value).to_string());
        }
        store
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SettingsError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Step a [`QueueTransport`] plays back.
pub enum Step {
    Reply(Result<HttpResponse, TransportFailure>),
    /// Never answers; only a timeout or cancellation ends the call.
    Hang,
    /// Runs a side effect while the request is on the wire, then replies.
    Effect(Box<dyn FnOnce() + Send>, Result<HttpResponse, TransportFailure>),
}

/// Transport that replays queued outcomes and records what was sent.
/// An exhausted queue answers `200 {}`.
#[derive(Default)]
pub struct QueueTransport {
    steps: Mutex<VecDeque<Step>>,
    pub sent: Mutex<Vec<HttpRequest>>,
}

impl QueueTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

pub fn ok_json(body: &serde_json::Value) -> Step {
    Step::Reply(Ok(HttpResponse::json(200, body)))
}

pub fn status(code: u16) -> Step {
    Step::Reply(Ok(HttpResponse {
        status: code,
        body: Vec::new(),
    }))
}

pub fn network() -> Step {
    Step::Reply(Err(TransportFailure::Network("connection refused".to_string())))
}

impl HttpTransport for QueueTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportFailure> {
        self.sent.lock().push(request.clone());
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Reply(outcome)) => outcome,
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Effect(effect, outcome)) => {
                effect();
                outcome
            }
            None => Ok(HttpResponse::json(200, &serde_json::json!({}))),
        }
    }
}
