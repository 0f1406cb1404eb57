//! Durable storage for captured responses
//!
//! A store holds one flat mapping from fingerprint to [`StoredResponse`].
//! Saves overwrite the whole mapping; nothing is appended.

mod file;
mod memory;
mod record;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use record::{FailureKind, OriginalRequest, Outcome, StoredResponse};

use crate::Result;

/// Mapping from fingerprint to record, in key order
pub type StoredResponses = BTreeMap<String, StoredResponse>;

/// Load/save/clear capability over one durable location
///
/// Implementations need not serialize their own operations; callers that
/// share a store across tasks must order `save` and `clear` themselves.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Read the whole mapping
    ///
    /// # Errors
    ///
    /// Returns error if the store exists but cannot be read or decoded.
    /// A store that was never written yields an empty mapping.
    async fn load(&self) -> Result<StoredResponses>;

    /// Replace the whole mapping
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written
    async fn save(&self, responses: &StoredResponses) -> Result<()>;

    /// Reset the store to empty
    ///
    /// # Errors
    ///
    /// Returns error if an existing store cannot be removed
    async fn clear(&self) -> Result<()>;

    /// Human-readable location for logs
    fn location(&self) -> String;
}
