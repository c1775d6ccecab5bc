//! Explorer configuration.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::endpoints::Endpoints;
use crate::error::ConfigError;

/// Log level per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: component_name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Filter directives such as `"info,chainview_core=debug"`.
    pub fn directives(&self) -> String {
        let mut components: Vec<_> = self.components.iter().collect();
        components.sort();
        let mut directives = self.level.clone();
        for (component, level) in components {
            directives.push_str(&format!(",{}={}", component.replace('-', "_"), level));
        }
        directives
    }
}

/// Top-level explorer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Backend origin, e.g. "http://localhost:8000"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix of every API endpoint
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Rows shown by each live table
    #[serde(default = "default_table_size")]
    pub table_size: usize,
    /// Records replayed by the backend on connect; defaults to `table_size`
    #[serde(default)]
    pub prefetch_limit: Option<usize>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_base_url() -> String { "http://localhost:8000".into() }
fn default_api_prefix() -> String { "/api/v1".into() }
fn default_table_size() -> usize { 10 }
fn default_request_timeout_ms() -> u64 { 30_000 }
fn default_connect_timeout_ms() -> u64 { 10_000 }

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            table_size: default_table_size(),
            prefetch_limit: None,
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            log: LogConfig::default(),
        }
    }
}

impl ExplorerConfig {
    /// Defaults pointed at a different backend.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "base_url".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.table_size == 0 {
            return Err(ConfigError::Invalid {
                field: "table_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        self.endpoints().map(|_| ())
    }

    /// Live table capacity.
    pub fn capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.table_size).ok_or_else(|| ConfigError::Invalid {
            field: "table_size".into(),
            reason: "must be at least 1".into(),
        })
    }

    pub fn prefetch_limit(&self) -> usize {
        self.prefetch_limit.unwrap_or(self.table_size)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
        Endpoints::new(&self.base_url, &self.api_prefix)
    }
}
