//! User settings for Stardust
//!
//! Non-sensitive preferences persisted to `config.json`. API keys are never
//! stored here; they come from `STARDUST_API_KEY` or the command line.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::StardustPaths;
use crate::error::{StardustError, StardustResult};
use crate::prompt::MemoryThresholds;
use crate::storage::{read_json, write_json_atomic};

/// Environment variable overriding the service URL
pub const API_URL_ENV: &str = "STARDUST_API_URL";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "STARDUST_API_KEY";

/// Memory thresholds in megabytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Above this, soft caches are cleared before decrypting
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold_mb: u64,

    /// Below this, a pre-check reports memory as ready
    #[serde(default = "default_ready_threshold")]
    pub ready_threshold_mb: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            warn_threshold_mb: default_warn_threshold(),
            ready_threshold_mb: default_ready_threshold(),
        }
    }
}

impl MemorySettings {
    pub fn thresholds(&self) -> MemoryThresholds {
        MemoryThresholds {
            warn_mb: self.warn_threshold_mb,
            ready_mb: self.ready_threshold_mb,
        }
    }
}

/// Template options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    /// Expose `@date`, `@time`, `@timestamp` and `@random`
    #[serde(default)]
    pub builtin_variables: bool,
}

/// User settings for Stardust
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Prompt service base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub memory: MemorySettings,

    /// Lifetime of cached session metadata
    #[serde(default = "default_session_cache_ttl")]
    pub session_cache_ttl_secs: u64,

    #[serde(default)]
    pub template: TemplateSettings,
}

fn default_schema_version() -> u32 {
    1
}

fn default_api_base_url() -> String {
    "https://api.stardust-dreams.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_warn_threshold() -> u64 {
    100
}

fn default_ready_threshold() -> u64 {
    200
}

fn default_session_cache_ttl() -> u64 {
    300
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            memory: MemorySettings::default(),
            session_cache_ttl_secs: default_session_cache_ttl(),
            template: TemplateSettings::default(),
        }
    }
}

impl Settings {
    /// Service URL, with `STARDUST_API_URL` taking precedence
    pub fn effective_api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.api_base_url.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.session_cache_ttl_secs)
    }

    /// Load settings from disk, or defaults if the file doesn't exist
    ///
    /// Defaults are not written back; the caller decides when to persist.
    pub async fn load_or_create(paths: &StardustPaths) -> StardustResult<Self> {
        read_json(paths.settings_file()).await.map_err(|e| match e {
            StardustError::Storage(msg) => StardustError::Config(msg),
            other => other,
        })
    }

    /// Save settings to disk
    pub async fn save(&self, paths: &StardustPaths) -> StardustResult<()> {
        paths.ensure_storage_dir().await?;
        write_json_atomic(paths.settings_file(), self).await
    }
}
