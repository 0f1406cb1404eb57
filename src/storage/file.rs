//! JSON file store

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{ResponseStore, StoredResponses};
use crate::{MockerError, Result};

/// Store backed by a single pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store at `path`; nothing is touched until the first save
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, reason: impl std::fmt::Display) -> MockerError {
        MockerError::Persistence {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Sibling file written first and renamed over the real one
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ResponseStore for JsonFileStore {
    async fn load(&self) -> Result<StoredResponses> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored responses yet");
                return Ok(StoredResponses::new());
            }
            Err(e) => return Err(self.persistence_error(e)),
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoredResponses::new());
        }

        serde_json::from_slice(&content).map_err(|e| self.persistence_error(e))
    }

    async fn save(&self, responses: &StoredResponses) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.persistence_error(e))?;
            }
        }

        let content = serde_json::to_vec_pretty(responses)?;
        let staging = self.staging_path();
        fs::write(&staging, &content)
            .await
            .map_err(|e| self.persistence_error(e))?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.persistence_error(e))?;

        debug!(
            path = %self.path.display(),
            records = responses.len(),
            "Saved stored responses"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.persistence_error(e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
