//! Mock resolution engine
//!
//! One fetch walks: fingerprint, then (when mocking) static mocks and stored
//! records, then the live transport, then optional capture of the outcome.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{MockerConfig, MockerOptions};
use crate::fingerprint::{fingerprint, normalize_method};
use crate::network::{HttpClient, LiveRequest, LiveResponse, LiveTransport};
use crate::registry::{MockEntry, MockRegistry};
use crate::replay::{CacheStats, ResponseCache};
use crate::storage::{
    FailureKind, JsonFileStore, OriginalRequest, Outcome, ResponseStore, StoredResponse,
    StoredResponses,
};
use crate::Result;

use super::response::{FetchFailure, FetchOptions, MockResponse, ResponseSource};

/// Result of one fetch
pub type FetchResult = std::result::Result<MockResponse, FetchFailure>;

/// Request interceptor that replays, serves static mocks, or calls through
///
/// Safe to share between tasks behind an [`Arc`]. Concurrent live calls to the
/// same request may race to store their outcome; the last save wins.
pub struct Mocker {
    is_mocking: AtomicBool,
    store_error_responses: AtomicBool,
    default_delay_ms: AtomicU64,
    storage_path: PathBuf,
    cache: ResponseCache,
    registry: MockRegistry,
    transport: Arc<dyn LiveTransport>,
}

impl Mocker {
    /// Create a mocker over a JSON file store and the built-in HTTP client
    pub async fn new(config: MockerConfig) -> Self {
        let store = Arc::new(JsonFileStore::new(config.storage_path.clone()));
        Self::with_components(config, store, Arc::new(HttpClient::new())).await
    }

    /// Resolve `options` against the environment, then create a mocker
    ///
    /// # Errors
    ///
    /// Returns error if the environment holds unparseable values
    pub async fn from_options(options: MockerOptions) -> Result<Self> {
        Ok(Self::new(options.resolve()?).await)
    }

    /// Create a mocker over an arbitrary store and transport
    ///
    /// Stored responses are loaded only when response storage is enabled.
    pub async fn with_components(
        config: MockerConfig,
        store: Arc<dyn ResponseStore>,
        transport: Arc<dyn LiveTransport>,
    ) -> Self {
        let cache = ResponseCache::new(store, config.store_real_responses);
        if config.store_real_responses {
            cache.load_from_persistence().await;
        }

        info!(
            mocking = config.is_mocking,
            store_real = config.store_real_responses,
            store_errors = config.store_error_responses,
            default_delay_ms = config.default_delay_ms,
            "Mocker initialized"
        );

        Self {
            is_mocking: AtomicBool::new(config.is_mocking),
            store_error_responses: AtomicBool::new(config.store_error_responses),
            default_delay_ms: AtomicU64::new(config.default_delay_ms),
            storage_path: config.storage_path,
            cache,
            registry: MockRegistry::new(),
            transport,
        }
    }

    /// Fetch `url`, from a mock when possible, otherwise live
    ///
    /// # Errors
    ///
    /// Returns [`FetchFailure`] for transport failures, non-2xx statuses,
    /// unparseable payloads, and replayed stored failures.
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> FetchResult {
        let url = options.resolve_url(url);
        let method = normalize_method(&options.method);
        let key = fingerprint(&url, &method, options.body.as_ref());

        if self.is_mocking() {
            if let Some(entry) = self.registry.find(&method, &url) {
                debug!(method = %method, url = %url, "Serving static mock");
                return self.serve_static(entry).await;
            }

            if let Some(record) = self.cache.get(&key) {
                debug!(fingerprint = %key, "Serving stored response");
                simulate_delay(self.default_delay_ms()).await;
                return self.replay(&record);
            }
        }

        let request = LiveRequest::new(
            url.clone(),
            method.clone(),
            options.headers.clone(),
            options.body.as_ref(),
        );

        debug!(method = %method, url = %url, "Performing live call");
        let result = match self.transport.perform(&request).await {
            Ok(response) => interpret(response),
            Err(e) => Err(FetchFailure::new(
                FailureKind::Transport,
                0,
                e.message(),
                None,
                BTreeMap::new(),
                ResponseSource::Live,
            )),
        };

        if let Err(failure) = &result {
            warn!(method = %method, url = %url, error = %failure, "Live call failed");
        }

        self.capture(key, url, method, options, &result).await;
        result
    }

    /// Stored record for a request, if any
    pub fn get_stored_response(
        &self,
        url: &str,
        method: &str,
        body: Option<&Value>,
    ) -> Option<StoredResponse> {
        self.cache.peek(&fingerprint(url, method, body))
    }

    /// Every stored record, keyed by fingerprint
    pub fn get_all_stored_responses(&self) -> StoredResponses {
        self.cache.all()
    }

    /// Remove every stored record, in memory and on disk
    pub async fn clear_stored_responses(&self) {
        self.cache.clear().await;
    }

    /// Replace the in-memory records with the durable store's contents
    ///
    /// Useful for replaying with storage disabled, where nothing is loaded
    /// at construction.
    pub async fn load_stored_responses(&self) {
        self.cache.load_from_persistence().await;
    }

    /// Clear stored records and static mocks
    pub async fn reset(&self) {
        self.registry.clear();
        self.cache.clear().await;
        info!("Mocker reset");
    }

    /// Register a static mock; a duplicate (endpoint, method) is ignored
    ///
    /// Returns whether the entry was added.
    pub fn register_mock(&self, entry: MockEntry) -> bool {
        self.registry.register(entry)
    }

    /// Register a static mock, replacing any with the same (endpoint, method)
    pub fn replace_mock(&self, entry: MockEntry) -> Option<MockEntry> {
        self.registry.replace(entry)
    }

    /// Registered static mocks
    pub fn mocks(&self) -> Vec<MockEntry> {
        self.registry.entries()
    }

    /// Serve mocks and stored records
    pub fn enable_mocking(&self) {
        self.is_mocking.store(true, Ordering::Relaxed);
        info!("Mocking enabled");
    }

    /// Always call through
    pub fn disable_mocking(&self) {
        self.is_mocking.store(false, Ordering::Relaxed);
        info!("Mocking disabled");
    }

    /// Whether mocks and stored records are served
    pub fn is_mocking(&self) -> bool {
        self.is_mocking.load(Ordering::Relaxed)
    }

    /// Capture live responses
    pub fn enable_storage(&self) {
        self.cache.set_write_through(true);
        info!("Response storage enabled");
    }

    /// Stop capturing live responses
    pub fn disable_storage(&self) {
        self.cache.set_write_through(false);
        info!("Response storage disabled");
    }

    /// Also capture failed live calls
    pub fn enable_error_storage(&self) {
        self.store_error_responses.store(true, Ordering::Relaxed);
        info!("Error response storage enabled");
    }

    /// Stop capturing failed live calls
    pub fn disable_error_storage(&self) {
        self.store_error_responses.store(false, Ordering::Relaxed);
        info!("Error response storage disabled");
    }

    /// Set the delay for mocks without their own
    pub fn set_default_delay_ms(&self, delay_ms: u64) {
        self.default_delay_ms.store(delay_ms, Ordering::Relaxed);
    }

    /// Delay for mocks without their own
    pub fn default_delay_ms(&self) -> u64 {
        self.default_delay_ms.load(Ordering::Relaxed)
    }

    /// Current configuration, including runtime toggles
    pub fn config(&self) -> MockerConfig {
        MockerConfig {
            is_mocking: self.is_mocking(),
            store_real_responses: self.cache.write_through(),
            store_error_responses: self.store_error_responses.load(Ordering::Relaxed),
            default_delay_ms: self.default_delay_ms(),
            storage_path: self.storage_path.clone(),
        }
    }

    /// Hit/miss statistics of the response cache
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn serve_static(&self, entry: MockEntry) -> FetchResult {
        simulate_delay(entry.delay_ms.unwrap_or_else(|| self.default_delay_ms())).await;

        if (200..300).contains(&entry.status) {
            return Ok(MockResponse::new(
                entry.status,
                entry.headers,
                entry.response,
                ResponseSource::Static,
            ));
        }

        Err(FetchFailure::new(
            FailureKind::HttpStatus,
            entry.status,
            status_message(entry.status),
            Some(entry.response),
            entry.headers,
            ResponseSource::Static,
        ))
    }

    /// Turn a stored record into a result
    ///
    /// A stored failure replays as a failure only while error storage is
    /// enabled; otherwise it is served as a 200 carrying the captured body.
    fn replay(&self, record: &StoredResponse) -> FetchResult {
        if self.store_error_responses.load(Ordering::Relaxed) {
            let replayed = FetchFailure::from_outcome(&record.outcome, record.headers.clone());
            if let Some(failure) = replayed {
                return Err(failure);
            }
        }

        let data = match &record.outcome {
            Outcome::Success { data } => data.clone(),
            Outcome::Failure { body, .. } => body.clone().unwrap_or(Value::Null),
        };
        Ok(MockResponse::new(
            StatusCode::OK.as_u16(),
            record.headers.clone(),
            data,
            ResponseSource::Stored,
        ))
    }

    async fn capture(
        &self,
        key: String,
        url: String,
        method: String,
        options: FetchOptions,
        result: &FetchResult,
    ) {
        if !self.cache.write_through() {
            return;
        }

        let (outcome, headers) = match result {
            Ok(response) => (
                Outcome::Success {
                    data: response.data().clone(),
                },
                response.headers().clone(),
            ),
            Err(failure) => {
                if !self.store_error_responses.load(Ordering::Relaxed) {
                    return;
                }
                (failure.to_outcome(), failure.response().headers().clone())
            }
        };

        let original_request = OriginalRequest {
            url,
            method,
            body: options.body,
            headers: options.headers,
        };

        self.cache
            .put(key, StoredResponse::new(outcome, headers, original_request))
            .await;
    }
}

/// Suspend to emulate network latency
async fn simulate_delay(delay_ms: u64) {
    if delay_ms > 0 {
        debug!(delay_ms, "Applying delay");
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

/// Classify a raw live response
fn interpret(response: LiveResponse) -> FetchResult {
    let claims_json = response
        .header("content-type")
        .is_some_and(|value| value.contains("json"));
    let success = response.is_success();
    let LiveResponse {
        status,
        headers,
        body,
    } = response;

    if !success {
        let payload = parse_payload(&body, claims_json).ok();
        let message = payload
            .as_ref()
            .and_then(|value| value.get("message"))
            .and_then(Value::as_str)
            .map_or_else(|| status_message(status), str::to_string);

        return Err(FetchFailure::new(
            FailureKind::HttpStatus,
            status,
            message,
            payload,
            headers,
            ResponseSource::Live,
        ));
    }

    match parse_payload(&body, claims_json) {
        Ok(data) => Ok(MockResponse::new(status, headers, data, ResponseSource::Live)),
        Err(reason) => Err(FetchFailure::new(
            FailureKind::Serialization,
            status,
            reason,
            None,
            headers,
            ResponseSource::Live,
        )),
    }
}

/// Parse a body into a payload
///
/// Empty bodies are `null`. Bodies that are not JSON are kept as strings,
/// unless the response claimed to be JSON or is not UTF-8.
fn parse_payload(body: &[u8], claims_json: bool) -> std::result::Result<Value, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(value) => Ok(value),
        Err(e) if claims_json => Err(format!("Invalid JSON response body: {e}")),
        Err(_) => String::from_utf8(body.to_vec())
            .map(Value::String)
            .map_err(|e| format!("Response body is neither JSON nor UTF-8: {e}")),
    }
}

fn status_message(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), str::to_string)
}
