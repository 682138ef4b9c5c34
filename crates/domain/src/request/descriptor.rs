//! Request descriptor type

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::HttpMethod;

/// Describes one logical call against the wallet API.
///
/// The descriptor is relative to the configured base URL; the transport
/// client resolves it against the config current at send time. A retry
/// reuses the same descriptor with [`RequestDescriptor::retried`] set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Identifier shared by the first attempt and its retry.
    pub id: Uuid,
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the base URL, e.g. `/wallets/abc/balance`
    pub path: String,
    /// Optional JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Set once the request has been retried.
    #[serde(default)]
    pub retried: bool,
}

impl RequestDescriptor {
    /// Creates a descriptor for the given method and path.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            method,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    /// Creates a GET descriptor.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST descriptor with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, path).with_body(body)
    }

    /// Attaches a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the retry of this descriptor: same id, method, path and body.
    #[must_use]
    pub fn as_retry(&self) -> Self {
        Self {
            retried: true,
            ..self.clone()
        }
    }

    /// Joins the path onto a base URL, normalizing the slash between them.
    #[must_use]
    pub fn url_for(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.path.is_empty() {
            return base.to_string();
        }
        if self.path.starts_with('/') {
            format!("{base}{}", self.path)
        } else {
            format!("{base}/{}", self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_for_normalizes_slashes() {
        let req = RequestDescriptor::get("/health");
        assert_eq!(req.url_for("http://localhost:8080/api/"), "http://localhost:8080/api/health");

        let req = RequestDescriptor::get("wallets");
        assert_eq!(req.url_for("http://localhost:8080/api"), "http://localhost:8080/api/wallets");
    }

    #[test]
    fn test_retry_keeps_identity() {
        let req = RequestDescriptor::post("/wallets", serde_json::json!({"name": "main"}));
        let retry = req.as_retry();
        assert!(retry.retried);
        assert!(!req.retried);
        assert_eq!(retry.id, req.id);
        assert_eq!(retry.body, req.body);
    }
}
