//! Configuration types for Mockfetch
//!
//! Values are resolved once, in order of precedence: explicit
//! [`MockerOptions`], then `MOCKFETCH_*` environment variables, then an
//! optional TOML file, then defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{MockerError, Result};

/// Environment variable enabling replay of stored responses
pub const ENV_IS_MOCKING: &str = "MOCKFETCH_IS_MOCKING";
/// Environment variable enabling capture of live responses
pub const ENV_STORE_REAL_RESPONSES: &str = "MOCKFETCH_STORE_REAL_RESPONSES";
/// Environment variable enabling capture of failed live calls
pub const ENV_STORE_ERROR_RESPONSES: &str = "MOCKFETCH_STORE_ERROR_RESPONSES";
/// Environment variable for the default mock delay
pub const ENV_DEFAULT_DELAY_MS: &str = "MOCKFETCH_DEFAULT_DELAY_MS";
/// Environment variable for the stored responses file
pub const ENV_STORAGE_PATH: &str = "MOCKFETCH_STORAGE_PATH";

/// Default location of the stored responses file
pub const DEFAULT_STORAGE_PATH: &str = ".mockfetch/responses.json";

fn default_storage_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_PATH)
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockerConfig {
    /// Serve stored and static responses instead of live calls
    pub is_mocking: bool,
    /// Capture successful live calls
    pub store_real_responses: bool,
    /// Also capture failed live calls (needs `store_real_responses`)
    pub store_error_responses: bool,
    /// Delay applied to mocked responses without their own delay
    pub default_delay_ms: u64,
    /// Stored responses file
    pub storage_path: PathBuf,
}

impl Default for MockerConfig {
    fn default() -> Self {
        Self {
            is_mocking: false,
            store_real_responses: false,
            store_error_responses: false,
            default_delay_ms: 0,
            storage_path: default_storage_path(),
        }
    }
}

/// Explicit overrides; `None` falls back to environment, then defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockerOptions {
    /// Override for [`MockerConfig::is_mocking`]
    pub is_mocking: Option<bool>,
    /// Override for [`MockerConfig::store_real_responses`]
    pub store_real_responses: Option<bool>,
    /// Override for [`MockerConfig::store_error_responses`]
    pub store_error_responses: Option<bool>,
    /// Override for [`MockerConfig::default_delay_ms`]
    pub default_delay_ms: Option<u64>,
    /// Override for [`MockerConfig::storage_path`]
    pub storage_path: Option<PathBuf>,
}

impl MockerOptions {
    /// Set mocking on or off
    #[must_use]
    pub fn mocking(mut self, enabled: bool) -> Self {
        self.is_mocking = Some(enabled);
        self
    }

    /// Set live-response capture on or off
    #[must_use]
    pub fn store_real_responses(mut self, enabled: bool) -> Self {
        self.store_real_responses = Some(enabled);
        self
    }

    /// Set failure capture on or off
    #[must_use]
    pub fn store_error_responses(mut self, enabled: bool) -> Self {
        self.store_error_responses = Some(enabled);
        self
    }

    /// Set the default delay
    #[must_use]
    pub fn default_delay_ms(mut self, delay_ms: u64) -> Self {
        self.default_delay_ms = Some(delay_ms);
        self
    }

    /// Set the storage path
    #[must_use]
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Resolve against the process environment and defaults
    ///
    /// # Errors
    ///
    /// Returns error if an environment variable holds an unparseable value
    pub fn resolve(self) -> Result<MockerConfig> {
        self.resolve_with(MockerConfig::default(), |key| std::env::var(key).ok())
    }

    /// Resolve against `base` and an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a looked-up value is unparseable
    pub fn resolve_with<F>(self, base: MockerConfig, lookup: F) -> Result<MockerConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_bool = |key: &str| lookup(key).map(|raw| parse_bool(key, &raw)).transpose();

        let is_mocking = match self.is_mocking {
            Some(value) => value,
            None => env_bool(ENV_IS_MOCKING)?.unwrap_or(base.is_mocking),
        };
        let store_real_responses = match self.store_real_responses {
            Some(value) => value,
            None => env_bool(ENV_STORE_REAL_RESPONSES)?.unwrap_or(base.store_real_responses),
        };
        let store_error_responses = match self.store_error_responses {
            Some(value) => value,
            None => env_bool(ENV_STORE_ERROR_RESPONSES)?.unwrap_or(base.store_error_responses),
        };
        let default_delay_ms = match self.default_delay_ms {
            Some(value) => value,
            None => match lookup(ENV_DEFAULT_DELAY_MS) {
                Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                    MockerError::ConfigError(format!(
                        "{ENV_DEFAULT_DELAY_MS}: invalid delay '{raw}': {e}"
                    ))
                })?,
                None => base.default_delay_ms,
            },
        };
        let storage_path = match self.storage_path {
            Some(path) => path,
            None => lookup(ENV_STORAGE_PATH)
                .filter(|raw| !raw.trim().is_empty())
                .map_or(base.storage_path, PathBuf::from),
        };

        let config = MockerConfig {
            is_mocking,
            store_real_responses,
            store_error_responses,
            default_delay_ms,
            storage_path,
        };
        config.validate()?;
        Ok(config)
    }
}

impl MockerConfig {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MockerError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.storage_path.as_os_str().is_empty() {
            return Err(MockerError::ConfigError(
                "storage_path cannot be empty".to_string(),
            ));
        }

        if self.storage_path.is_dir() {
            return Err(MockerError::ConfigError(format!(
                "storage_path is a directory: {}",
                self.storage_path.display()
            )));
        }

        Ok(())
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(MockerError::ConfigError(format!(
            "{key}: expected a boolean, got '{raw}'"
        ))),
    }
}
