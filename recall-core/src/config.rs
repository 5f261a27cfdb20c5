//! Configuration for the recall memory store.
//!
//! Maps directly to `recall.toml`. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration. Environment variables
//! named in the file override the file values, see
//! [`RecallConfig::apply_env`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, Result};

/// Top-level recall configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecallConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Remote memory API.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Local JSON fallback file.
    #[serde(default)]
    pub local: LocalConfig,
    /// Search result cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Search defaults.
    #[serde(default)]
    pub search: SearchConfig,
}

impl RecallConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `RecallError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| RecallError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Override file values with environment values.
    ///
    /// `lookup` resolves a variable name; pass `|k| std::env::var(k).ok()`
    /// in production. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = present(&self.remote.api_key_env) {
            self.remote.api_key = Some(key);
        }
        if let Some(path) = present(&self.local.path_env) {
            self.local.path = PathBuf::from(path);
        }
    }

    /// Reject settings the store cannot work with.
    ///
    /// # Errors
    /// Returns `RecallError::Config` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.search.default_limit == 0 {
            return Err(RecallError::Config("search.default_limit must be at least 1".into()));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(RecallError::Config("cache.capacity must be at least 1".into()));
        }
        if self.remote.base_url.trim().is_empty() {
            return Err(RecallError::Config("remote.base_url must not be empty".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Remote memory API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL; `/add` and `/search` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key. Without one the store runs in local mode.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable that overrides `api_key`.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteConfig {
    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Local JSON file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Path of the JSON array file.
    #[serde(default = "default_local_path")]
    pub path: PathBuf,
    /// Environment variable that overrides `path`.
    #[serde(default = "default_path_env")]
    pub path_env: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            path: default_local_path(),
            path_env: default_path_env(),
        }
    }
}

/// Search result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether recall results are cached.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Time-to-live of a cached result set, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum number of cached keys (least recently used are evicted).
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl CacheConfig {
    /// Time-to-live as a duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

/// Search defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results per search when the caller gives no limit.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (for serde)
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_base_url() -> String {
    "https://v2.api.supermemory.ai".to_string()
}
fn default_api_key_env() -> String {
    "SUPERMEMORY_API_KEY".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_local_path() -> PathBuf {
    PathBuf::from(".recall/local-memories.json")
}
fn default_path_env() -> String {
    "LOCAL_MEMORY_PATH".to_string()
}
fn default_ttl_secs() -> u64 {
    300
}
fn default_capacity() -> usize {
    256
}
fn default_limit() -> usize {
    crate::types::DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = RecallConfig::from_toml("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.remote.base_url, "https://v2.api.supermemory.ai");
        assert!(config.remote.api_key.is_none());
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.search.default_limit, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = RecallConfig::from_toml(
            r#"
            [local]
            path = "/tmp/notes.json"

            [cache]
            ttl_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.local.path, PathBuf::from("/tmp/notes.json"));
        assert_eq!(config.local.path_env, "LOCAL_MEMORY_PATH");
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.cache.enabled);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = RecallConfig::from_toml("[cache\nttl_secs = ").unwrap_err();
        assert!(matches!(err, RecallError::Config(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = RecallConfig::default();
        config.remote.api_key = Some("from-file".into());
        config.apply_env(|name| match name {
            "SUPERMEMORY_API_KEY" => Some("from-env".into()),
            "LOCAL_MEMORY_PATH" => Some("/data/mem.json".into()),
            _ => None,
        });
        assert_eq!(config.remote.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.local.path, PathBuf::from("/data/mem.json"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = RecallConfig::default();
        config.apply_env(|_| Some("   ".into()));
        assert!(config.remote.api_key.is_none());
        assert_eq!(config.local.path, default_local_path());
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let mut config = RecallConfig::default();
        config.search.default_limit = 0;
        assert!(config.validate().is_err());
    }
}
