//! Response cache with write-through persistence

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::storage::{ResponseStore, StoredResponse, StoredResponses};

/// In-memory mirror of the durable store
///
/// Reads never touch storage. Writes go to memory first and, while write-through
/// is on, the whole mapping is then saved. Persistence failures are logged and
/// swallowed: the cache keeps serving from memory.
pub struct ResponseCache {
    /// Map of fingerprint to record
    entries: DashMap<String, StoredResponse>,
    /// Durable store behind the cache
    store: Arc<dyn ResponseStore>,
    /// Serializes snapshot+save and clear so durable writes never interleave
    persist_lock: Mutex<()>,
    /// Whether puts are saved to the store
    write_through: AtomicBool,
    /// Whether the store has been read into memory
    loaded: AtomicBool,
    /// Cache hit counter
    hits: AtomicUsize,
    /// Cache miss counter
    misses: AtomicUsize,
}

impl ResponseCache {
    /// Create an empty cache over `store`
    ///
    /// Nothing is read until [`load_from_persistence`](Self::load_from_persistence)
    /// or the first write-through.
    #[must_use]
    pub fn new(store: Arc<dyn ResponseStore>, write_through: bool) -> Self {
        Self {
            entries: DashMap::new(),
            store,
            persist_lock: Mutex::new(()),
            write_through: AtomicBool::new(write_through),
            loaded: AtomicBool::new(false),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Replace the in-memory mapping with the store's contents
    ///
    /// A store that cannot be read is treated as empty.
    pub async fn load_from_persistence(&self) {
        let _guard = self.persist_lock.lock().await;
        let loaded = self.load_or_empty().await;

        self.entries.clear();
        let count = loaded.len();
        for (key, record) in loaded {
            self.entries.insert(key, record);
        }
        self.loaded.store(true, Ordering::Release);

        info!(
            store = %self.store.location(),
            records = count,
            "Loaded stored responses"
        );
    }

    /// Look up a record by fingerprint
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<StoredResponse> {
        if let Some(record) = self.entries.get(fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(record.value().clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Look up a record without touching the hit/miss counters
    #[must_use]
    pub fn peek(&self, fingerprint: &str) -> Option<StoredResponse> {
        self.entries.get(fingerprint).map(|record| record.value().clone())
    }

    /// All records in fingerprint order
    #[must_use]
    pub fn all(&self) -> StoredResponses {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Insert or replace a record
    ///
    /// With write-through on, the full mapping is saved afterwards. The first
    /// such save also merges in whatever the store already held, so records
    /// persisted before write-through was enabled survive.
    pub async fn put(&self, fingerprint: String, record: StoredResponse) {
        debug!(fingerprint = %fingerprint, "Caching response");
        self.entries.insert(fingerprint, record);

        if !self.write_through() {
            return;
        }

        let _guard = self.persist_lock.lock().await;

        if !self.loaded.swap(true, Ordering::AcqRel) {
            for (key, persisted) in self.load_or_empty().await {
                self.entries.entry(key).or_insert(persisted);
            }
        }

        let snapshot = self.all();
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(
                store = %self.store.location(),
                error = %e,
                "Failed to save stored responses"
            );
        }
    }

    /// Empty the cache and the durable store
    pub async fn clear(&self) {
        let _guard = self.persist_lock.lock().await;

        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);

        if let Err(e) = self.store.clear().await {
            warn!(
                store = %self.store.location(),
                error = %e,
                "Failed to clear stored responses"
            );
        }

        info!(store = %self.store.location(), "Cleared stored responses");
    }

    /// Turn write-through on or off
    pub fn set_write_through(&self, enabled: bool) {
        self.write_through.store(enabled, Ordering::Relaxed);
    }

    /// Whether puts are saved to the store
    #[must_use]
    pub fn write_through(&self) -> bool {
        self.write_through.load(Ordering::Relaxed)
    }

    /// Get cache hit count
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get cache miss count
    #[must_use]
    pub fn miss_count(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get cache hit rate (0.0 to 1.0)
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count();
        let misses = self.miss_count();
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Get the number of cached records
    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    async fn load_or_empty(&self) -> StoredResponses {
        match self.store.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(
                    store = %self.store.location(),
                    error = %e,
                    "Failed to load stored responses, starting empty"
                );
                StoredResponses::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonFileStore, MemoryStore, OriginalRequest, Outcome};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn test_record(data: Value) -> StoredResponse {
        StoredResponse::new(
            Outcome::Success { data },
            BTreeMap::new(),
            OriginalRequest {
                url: "https://x/y".to_string(),
                method: "GET".to_string(),
                body: None,
                headers: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn test_cache_creation() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), true);

        assert_eq!(cache.size(), 0);
        assert_eq!(cache.hit_count(), 0);
        assert_eq!(cache.miss_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_metrics() {
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), false);
        cache.put("k1".to_string(), test_record(json!(1))).await;

        assert!(cache.get("k1").is_some());
        assert_eq!(cache.hit_count(), 1);

        assert!(cache.get("k2").is_none());
        assert_eq!(cache.miss_count(), 1);

        assert!((cache.hit_rate() - 0.5).abs() < 0.01);

        assert!(cache.peek("k1").is_some());
        assert_eq!(cache.hit_count(), 1);
    }

    #[tokio::test]
    async fn test_put_writes_through() {
        let store = MemoryStore::new();
        let cache = ResponseCache::new(Arc::new(store.clone()), true);

        cache.put("k1".to_string(), test_record(json!({"a": 1}))).await;

        let persisted = store.snapshot();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted["k1"].data(), Some(&json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_put_without_write_through_stays_in_memory() {
        let store = MemoryStore::new();
        let cache = ResponseCache::new(Arc::new(store.clone()), false);

        cache.put("k1".to_string(), test_record(json!(1))).await;

        assert_eq!(cache.size(), 1);
        assert!(store.snapshot().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = MemoryStore::new();
        let cache = ResponseCache::new(Arc::new(store.clone()), true);

        cache.put("k1".to_string(), test_record(json!(1))).await;
        cache.put("k1".to_string(), test_record(json!(2))).await;

        assert_eq!(cache.size(), 1);
        assert_eq!(store.snapshot()["k1"].data(), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_load_from_persistence_replaces_memory() {
        let store = MemoryStore::new();
        let mut seeded = StoredResponses::new();
        seeded.insert("persisted".to_string(), test_record(json!("old")));
        store.save(&seeded).await.unwrap();

        let cache = ResponseCache::new(Arc::new(store), false);
        cache.put("fresh".to_string(), test_record(json!("new"))).await;
        cache.load_from_persistence().await;

        assert!(cache.peek("persisted").is_some());
        assert!(cache.peek("fresh").is_none());
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test]
    async fn test_late_write_through_merges_persisted() {
        let store = MemoryStore::new();
        let mut seeded = StoredResponses::new();
        seeded.insert("persisted".to_string(), test_record(json!("old")));
        seeded.insert("shared".to_string(), test_record(json!("old")));
        store.save(&seeded).await.unwrap();

        let cache = ResponseCache::new(Arc::new(store.clone()), false);
        cache.put("shared".to_string(), test_record(json!("new"))).await;

        cache.set_write_through(true);
        cache.put("fresh".to_string(), test_record(json!("new"))).await;

        let persisted = store.snapshot();
        assert_eq!(persisted.len(), 3);
        assert_eq!(persisted["persisted"].data(), Some(&json!("old")));
        assert_eq!(persisted["shared"].data(), Some(&json!("new")));
    }

    #[tokio::test]
    async fn test_clear_empties_memory_and_store() {
        let store = MemoryStore::new();
        let cache = ResponseCache::new(Arc::new(store.clone()), true);

        cache.put("k1".to_string(), test_record(json!(1))).await;
        let _ = cache.get("k1");

        cache.clear().await;
        cache.clear().await;

        assert_eq!(cache.size(), 0);
        assert_eq!(cache.hit_count(), 0);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_store_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("responses.json");
        std::fs::write(&path, b"garbage").unwrap();

        let cache = ResponseCache::new(Arc::new(JsonFileStore::new(&path)), true);
        cache.load_from_persistence().await;
        assert_eq!(cache.size(), 0);

        cache.put("k1".to_string(), test_record(json!(1))).await;
        assert_eq!(cache.size(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_store_keeps_serving() {
        let temp_dir = TempDir::new().unwrap();
        // The store path is a directory, so the rename onto it fails.
        let path = temp_dir.path().join("responses.json");
        std::fs::create_dir(&path).unwrap();

        let cache = ResponseCache::new(Arc::new(JsonFileStore::new(&path)), true);
        cache.put("k1".to_string(), test_record(json!(1))).await;

        assert!(cache.get("k1").is_some());
    }
}
