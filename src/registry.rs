//! Static mock registry
//!
//! Explicitly registered endpoint responses, independent of captured traffic.
//! Registration is first-wins: a second entry for the same (endpoint, method)
//! pair is ignored unless [`MockRegistry::replace`] is used.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use hyper::Uri;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::fingerprint::normalize_method;

fn default_status() -> u16 {
    200
}

/// A canned response for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockEntry {
    /// Full URL or path the entry answers
    pub endpoint: String,
    /// HTTP method
    pub method: String,
    /// Response payload
    pub response: Value,
    /// Response status
    #[serde(default = "default_status")]
    pub status: u16,
    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Simulated latency; the mocker's default delay applies when absent
    #[serde(default)]
    pub delay_ms: Option<u64>,
    /// Expected request shape, for documentation only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
}

impl MockEntry {
    /// Create a 200 entry with no headers or delay
    pub fn new(method: &str, endpoint: impl Into<String>, response: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: normalize_method(method),
            response,
            status: default_status(),
            headers: BTreeMap::new(),
            delay_ms: None,
            request: None,
        }
    }

    /// Set the simulated latency
    #[must_use]
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Set the response status
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a response header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Document the expected request shape
    #[must_use]
    pub fn with_request(mut self, request: Value) -> Self {
        self.request = Some(request);
        self
    }

    /// Whether this entry answers `method` on `url`
    ///
    /// The endpoint must equal either the whole URL or its path.
    #[must_use]
    pub fn matches(&self, method: &str, url: &str) -> bool {
        if !self.method.eq_ignore_ascii_case(method.trim()) {
            return false;
        }

        let url = url.trim();
        if self.endpoint == url {
            return true;
        }

        url.parse::<Uri>()
            .is_ok_and(|uri| uri.path() == self.endpoint)
    }

    fn same_key(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint && self.method.eq_ignore_ascii_case(&other.method)
    }
}

/// Registered static mocks, in registration order
#[derive(Debug, Default)]
pub struct MockRegistry {
    entries: RwLock<Vec<MockEntry>>,
}

impl MockRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry unless its (endpoint, method) is already registered
    ///
    /// Returns whether the entry was added.
    pub fn register(&self, mut entry: MockEntry) -> bool {
        entry.method = normalize_method(&entry.method);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.iter().any(|existing| existing.same_key(&entry)) {
            debug!(
                method = %entry.method,
                endpoint = %entry.endpoint,
                "Mock already registered, ignoring"
            );
            return false;
        }

        info!(method = %entry.method, endpoint = %entry.endpoint, "Registered mock");
        entries.push(entry);
        true
    }

    /// Add an entry, replacing any with the same (endpoint, method)
    ///
    /// Returns the replaced entry.
    pub fn replace(&self, mut entry: MockEntry) -> Option<MockEntry> {
        entry.method = normalize_method(&entry.method);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(slot) = entries.iter_mut().find(|existing| existing.same_key(&entry)) {
            info!(method = %entry.method, endpoint = %entry.endpoint, "Replaced mock");
            return Some(std::mem::replace(slot, entry));
        }

        info!(method = %entry.method, endpoint = %entry.endpoint, "Registered mock");
        entries.push(entry);
        None
    }

    /// First entry answering `method` on `url`
    #[must_use]
    pub fn find(&self, method: &str, url: &str) -> Option<MockEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|entry| entry.matches(method, url))
            .cloned()
    }

    /// All entries in registration order
    #[must_use]
    pub fn entries(&self) -> Vec<MockEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_registration_wins() {
        let registry = MockRegistry::new();

        assert!(registry.register(MockEntry::new("GET", "/ping", json!({"v": 1}))));
        assert!(!registry.register(MockEntry::new("get", "/ping", json!({"v": 2}))));

        assert_eq!(registry.len(), 1);
        let found = registry.find("GET", "/ping").unwrap();
        assert_eq!(found.response, json!({"v": 1}));
    }

    #[test]
    fn test_same_endpoint_different_method() {
        let registry = MockRegistry::new();

        assert!(registry.register(MockEntry::new("GET", "/items", json!([]))));
        assert!(registry.register(MockEntry::new("POST", "/items", json!({"id": 1}))));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find("POST", "/items").unwrap().response, json!({"id": 1}));
    }

    #[test]
    fn test_replace() {
        let registry = MockRegistry::new();
        registry.register(MockEntry::new("GET", "/ping", json!({"v": 1})));

        let old = registry.replace(MockEntry::new("GET", "/ping", json!({"v": 2})));

        assert_eq!(old.unwrap().response, json!({"v": 1}));
        assert_eq!(registry.find("GET", "/ping").unwrap().response, json!({"v": 2}));
        assert!(registry
            .replace(MockEntry::new("GET", "/pong", json!(null)))
            .is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_matches_full_url_or_path() {
        let entry = MockEntry::new("GET", "/ping", json!(true));

        assert!(entry.matches("GET", "/ping"));
        assert!(entry.matches("get", "https://api.example.com/ping"));
        assert!(entry.matches("GET", "https://api.example.com/ping?x=1"));
        assert!(!entry.matches("POST", "/ping"));
        assert!(!entry.matches("GET", "https://api.example.com/ping/more"));

        let absolute = MockEntry::new("GET", "https://api.example.com/ping", json!(true));
        assert!(absolute.matches("GET", "https://api.example.com/ping"));
        assert!(!absolute.matches("GET", "https://other.example.com/ping"));
    }

    #[test]
    fn test_clear() {
        let registry = MockRegistry::new();
        registry.register(MockEntry::new("GET", "/ping", json!(true)));

        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.find("GET", "/ping").is_none());
    }

    #[test]
    fn test_entry_defaults_from_json() {
        let entry: MockEntry = serde_json::from_value(json!({
            "endpoint": "/ping",
            "method": "GET",
            "response": {"pong": true},
            "delayMs": 50
        }))
        .unwrap();

        assert_eq!(entry.status, 200);
        assert_eq!(entry.delay_ms, Some(50));
        assert!(entry.headers.is_empty());
    }
}
