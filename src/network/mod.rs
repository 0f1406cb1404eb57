//! Live-call capability
//!
//! The mocker never talks to the network directly; it goes through a
//! [`LiveTransport`]. [`HttpClient`] is the built-in plain-HTTP transport.
//! HTTPS targets need a transport supplied by the caller.

mod client;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

pub use client::HttpClient;

/// Request handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRequest {
    /// Absolute URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Encoded request body
    pub body: Vec<u8>,
}

impl LiveRequest {
    /// Build a request, encoding a JSON body
    ///
    /// Strings are sent as raw UTF-8. Other values are serialized as JSON and
    /// get `content-type: application/json` unless one was given.
    #[must_use]
    pub fn new(
        url: String,
        method: String,
        mut headers: BTreeMap<String, String>,
        body: Option<&Value>,
    ) -> Self {
        let body = match body {
            None => Vec::new(),
            Some(Value::String(text)) => text.clone().into_bytes(),
            Some(value) => {
                let has_content_type = headers
                    .keys()
                    .any(|name| name.eq_ignore_ascii_case("content-type"));
                if !has_content_type {
                    headers.insert("content-type".to_string(), "application/json".to_string());
                }
                value.to_string().into_bytes()
            }
        };

        Self {
            url,
            method,
            headers,
            body,
        }
    }
}

/// Raw response returned by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
}

impl LiveResponse {
    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of a header, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Target could not be reached
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Create a transport error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Failure message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Capability to perform a live HTTP call
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Perform `request` against the real target
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no HTTP response was received.
    /// Non-success statuses are returned as responses, not errors.
    async fn perform(&self, request: &LiveRequest) -> Result<LiveResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body_sets_content_type() {
        let request = LiveRequest::new(
            "http://x/y".to_string(),
            "POST".to_string(),
            BTreeMap::new(),
            Some(&json!({"a": 1})),
        );

        assert_eq!(request.body, br#"{"a":1}"#);
        assert_eq!(request.headers["content-type"], "application/json");
    }

    #[test]
    fn test_string_body_is_raw() {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());

        let request = LiveRequest::new(
            "http://x/y".to_string(),
            "POST".to_string(),
            headers,
            Some(&json!("hello")),
        );

        assert_eq!(request.body, b"hello");
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_explicit_content_type_kept() {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/vnd.api+json".to_string());

        let request = LiveRequest::new(
            "http://x/y".to_string(),
            "POST".to_string(),
            headers,
            Some(&json!([1])),
        );

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers["Content-Type"], "application/vnd.api+json");
    }

    #[test]
    fn test_live_response_helpers() {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let response = LiveResponse {
            status: 204,
            headers,
            body: vec![],
        };

        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(!LiveResponse {
            status: 404,
            headers: BTreeMap::new(),
            body: vec![]
        }
        .is_success());
    }
}
