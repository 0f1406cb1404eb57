//! Responses and failures returned by [`Mocker::fetch`](super::Mocker::fetch)

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::fingerprint::DEFAULT_METHOD;
use crate::storage::{FailureKind, Outcome};

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// A live call to the real target
    Live,
    /// A stored record replayed from the cache
    Stored,
    /// A registered static mock
    Static,
}

/// Options for one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: Option<Value>,
    /// Query parameters appended to the URL
    pub query: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            headers: BTreeMap::new(),
            body: None,
            query: Vec::new(),
        }
    }
}

impl FetchOptions {
    /// GET with no body
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// Request with the given method
    #[must_use]
    pub fn method(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// `url` with the query parameters percent-encoded and appended
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        let mut resolved = url.trim().to_string();
        if self.query.is_empty() {
            return resolved;
        }

        let mut separator = if resolved.contains('?') { '&' } else { '?' };
        for (key, value) in &self.query {
            resolved.push(separator);
            resolved.push_str(&urlencoding::encode(key));
            resolved.push('=');
            resolved.push_str(&urlencoding::encode(value));
            separator = '&';
        }
        resolved
    }
}

/// A successful response
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    data: Value,
    source: ResponseSource,
}

impl MockResponse {
    /// Create a response
    #[must_use]
    pub fn new(
        status: u16,
        headers: BTreeMap<String, String>,
        data: Value,
        source: ResponseSource,
    ) -> Self {
        Self {
            status,
            headers,
            data,
            source,
        }
    }

    /// HTTP status
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is 2xx
    #[must_use]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Parsed payload
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Take the parsed payload
    #[must_use]
    pub fn into_data(self) -> Value {
        self.data
    }

    /// Deserialize the payload into `T`
    ///
    /// # Errors
    ///
    /// Returns error if the payload does not fit `T`
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }

    /// Where the response came from
    #[must_use]
    pub fn source(&self) -> ResponseSource {
        self.source
    }

    /// `message` field of an object payload, if any
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}

/// A failed live call, or a replay of one
///
/// Carries the same accessors as [`MockResponse`] through
/// [`response`](Self::response), so callers read status and payload the
/// same way on both arms of the result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} failure (status {status}): {message}")]
pub struct FetchFailure {
    message: String,
    kind: FailureKind,
    status: u16,
    body: Option<Value>,
    response: MockResponse,
}

impl FetchFailure {
    /// Create a failure
    ///
    /// The response view's payload is `body` when present, otherwise
    /// `{"message": ..., "kind": ...}`.
    #[must_use]
    pub fn new(
        kind: FailureKind,
        status: u16,
        message: impl Into<String>,
        body: Option<Value>,
        headers: BTreeMap<String, String>,
        source: ResponseSource,
    ) -> Self {
        let message = message.into();
        let data = body
            .clone()
            .unwrap_or_else(|| json!({ "message": message.clone(), "kind": kind.as_str() }));

        Self {
            response: MockResponse::new(status, headers, data, source),
            message,
            kind,
            status,
            body,
        }
    }

    /// Rebuild a failure from a stored outcome
    ///
    /// Returns `None` for success outcomes.
    #[must_use]
    pub fn from_outcome(outcome: &Outcome, headers: BTreeMap<String, String>) -> Option<Self> {
        match outcome {
            Outcome::Failure {
                message,
                kind,
                status,
                body,
            } => Some(Self::new(
                *kind,
                *status,
                message.clone(),
                body.clone(),
                headers,
                ResponseSource::Stored,
            )),
            Outcome::Success { .. } => None,
        }
    }

    /// Failure message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure category
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// HTTP status (0 for transport failures)
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response body, when one was received
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// The failure viewed as a response
    #[must_use]
    pub fn response(&self) -> &MockResponse {
        &self.response
    }

    /// Outcome to persist for this failure
    #[must_use]
    pub fn to_outcome(&self) -> Outcome {
        Outcome::Failure {
            message: self.message.clone(),
            kind: self.kind,
            status: self.status,
            body: self.body.clone(),
        }
    }
}
