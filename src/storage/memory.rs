//! In-memory store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{ResponseStore, StoredResponses};
use crate::Result;

/// Store that keeps the mapping in process memory
///
/// Clones share the same contents, so a clone handed to a
/// [`Mocker`](crate::mocker::Mocker) can be inspected from outside.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoredResponses>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents
    #[must_use]
    pub fn snapshot(&self) -> StoredResponses {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of completed saves
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ResponseStore for MemoryStore {
    async fn load(&self) -> Result<StoredResponses> {
        Ok(self.snapshot())
    }

    async fn save(&self, responses: &StoredResponses) -> Result<()> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone_from(responses);
        drop(guard);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
