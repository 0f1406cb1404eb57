//! Stored response records

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category of a failed live call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Target could not be reached; no HTTP semantics apply
    Transport,
    /// Target answered with a non-success status
    HttpStatus,
    /// Response body could not be parsed as the expected payload
    Serialization,
}

impl FailureKind {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::HttpStatus => "http_status",
            Self::Serialization => "serialization",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome captured from a live call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// Call succeeded with a parsed payload
    Success {
        /// Response payload
        data: Value,
    },
    /// Call failed
    Failure {
        /// Human-readable failure message
        message: String,
        /// Failure category
        kind: FailureKind,
        /// HTTP status (0 for transport failures)
        #[serde(default)]
        status: u16,
        /// Response body, parsed when possible
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },
}

/// Request that produced a stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginalRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request body
    #[serde(default)]
    pub body: Option<Value>,
    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// A persisted live-call outcome plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    /// Captured outcome
    pub outcome: Outcome,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request that produced this record
    pub original_request: OriginalRequest,
}

impl StoredResponse {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(
        outcome: Outcome,
        headers: BTreeMap<String, String>,
        original_request: OriginalRequest,
    ) -> Self {
        Self {
            outcome,
            timestamp: Utc::now(),
            headers,
            original_request,
        }
    }

    /// Success payload, if this record captured one
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Success { data } => Some(data),
            Outcome::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_request() -> OriginalRequest {
        OriginalRequest {
            url: "https://x/y".to_string(),
            method: "GET".to_string(),
            body: None,
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn test_success_layout() {
        let record = StoredResponse::new(
            Outcome::Success {
                data: json!({"a": 1}),
            },
            BTreeMap::new(),
            test_request(),
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["outcome"]["type"], "success");
        assert_eq!(value["outcome"]["data"], json!({"a": 1}));
        assert_eq!(value["originalRequest"]["url"], "https://x/y");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_failure_parses_without_optional_fields() {
        let raw = json!({
            "outcome": {"type": "failure", "message": "boom", "kind": "transport"},
            "timestamp": "2024-01-01T00:00:00Z",
            "originalRequest": {"url": "https://x/y", "method": "GET"}
        });

        let record: StoredResponse = serde_json::from_value(raw).unwrap();
        assert!(record.data().is_none());
        assert!(record.headers.is_empty());
        match record.outcome {
            Outcome::Failure { kind, status, .. } => {
                assert_eq!(kind, FailureKind::Transport);
                assert_eq!(status, 0);
            }
            Outcome::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn test_failure_kind_names() {
        assert_eq!(FailureKind::HttpStatus.to_string(), "http_status");
        assert_eq!(
            serde_json::to_value(FailureKind::Serialization).unwrap(),
            json!("serialization")
        );
    }
}
