//! Configuration for the build pipeline
//!
//! Values come from `APPGRAPH_*` environment variables, falling back to the
//! defaults below.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::CoreError;
use crate::services::WorkerConfig;

/// Upper bound for `APPGRAPH_DEBOUNCE_MS` (one hour).
pub const MAX_DEBOUNCE_MS: u64 = 60 * 60 * 1000;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the remote schema service
    #[serde(default = "default_remote_api_url")]
    pub remote_api_url: String,

    /// Per-request timeout for remote calls; none by default
    #[serde(default)]
    pub remote_timeout_secs: Option<u64>,

    /// Items requested per remote page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Cap on remote page calls in flight per build; unbounded by default
    #[serde(default)]
    pub max_concurrent_fetches: Option<usize>,

    /// Minimum age of a work item before it is built
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long shutdown waits for running builds
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Events buffered per notification group
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_remote_api_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_debounce_ms() -> u64 {
    3000
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

fn default_notification_buffer() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            remote_api_url: default_remote_api_url(),
            remote_timeout_secs: None,
            page_size: default_page_size(),
            max_concurrent_fetches: None,
            debounce_ms: default_debounce_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            notification_buffer: default_notification_buffer(),
            log_level: default_log_level(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, CoreError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    ///
    /// Unparsable values are logged and ignored; values that parse but make
    /// no sense are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("APPGRAPH_REMOTE_API_URL") {
            config.remote_api_url = url;
        }
        if let Some(timeout) = parse_var(&lookup, "APPGRAPH_REMOTE_TIMEOUT_SECS") {
            config.remote_timeout_secs = Some(timeout);
        }
        if let Some(page_size) = parse_var(&lookup, "APPGRAPH_PAGE_SIZE") {
            config.page_size = page_size;
        }
        if let Some(max) = parse_var(&lookup, "APPGRAPH_MAX_CONCURRENT_FETCHES") {
            config.max_concurrent_fetches = Some(max);
        }
        if let Some(debounce) = parse_var(&lookup, "APPGRAPH_DEBOUNCE_MS") {
            config.debounce_ms = debounce;
        }
        if let Some(grace) = parse_var(&lookup, "APPGRAPH_SHUTDOWN_GRACE_SECS") {
            config.shutdown_grace_secs = grace;
        }
        if let Some(buffer) = parse_var(&lookup, "APPGRAPH_NOTIFICATION_BUFFER") {
            config.notification_buffer = buffer;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.remote_api_url.trim().is_empty() {
            return Err(CoreError::ConfigError("APPGRAPH_REMOTE_API_URL must not be empty".to_string()));
        }
        if self.page_size == 0 {
            return Err(CoreError::ConfigError("APPGRAPH_PAGE_SIZE must be greater than 0".to_string()));
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(CoreError::ConfigError(format!(
                "APPGRAPH_DEBOUNCE_MS must be at most {}",
                MAX_DEBOUNCE_MS
            )));
        }
        if self.notification_buffer == 0 {
            return Err(CoreError::ConfigError(
                "APPGRAPH_NOTIFICATION_BUFFER must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote_timeout_secs.map(Duration::from_secs)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            debounce_window: self.debounce_window(),
        }
    }

    #[cfg(feature = "adapters")]
    pub fn http_client_config(&self) -> crate::adapters::HttpSchemaClientConfig {
        crate::adapters::HttpSchemaClientConfig {
            base_url: self.remote_api_url.clone(),
            page_size: self.page_size,
            timeout: self.remote_timeout(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Invalid {} value: {} ({})", key, raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<PipelineConfig, CoreError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.debounce_window(), Duration::from_secs(3));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(30));
        assert_eq!(config.remote_timeout(), None);
        assert_eq!(config.max_concurrent_fetches, None);
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = from_vars(&[
            ("APPGRAPH_REMOTE_API_URL", "https://schema.example.com/api"),
            ("APPGRAPH_REMOTE_TIMEOUT_SECS", "10"),
            ("APPGRAPH_PAGE_SIZE", "200"),
            ("APPGRAPH_MAX_CONCURRENT_FETCHES", "8"),
            ("APPGRAPH_DEBOUNCE_MS", "500"),
            ("APPGRAPH_SHUTDOWN_GRACE_SECS", "5"),
            ("APPGRAPH_NOTIFICATION_BUFFER", "16"),
            ("LOG_LEVEL", "debug"),
        ])
        .unwrap();

        assert_eq!(config.remote_api_url, "https://schema.example.com/api");
        assert_eq!(config.remote_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.page_size, 200);
        assert_eq!(config.max_concurrent_fetches, Some(8));
        assert_eq!(config.worker_config().debounce_window, Duration::from_millis(500));
        assert_eq!(config.shutdown_grace_secs, 5);
        assert_eq!(config.notification_buffer, 16);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let config = from_vars(&[
            ("APPGRAPH_PAGE_SIZE", "lots"),
            ("APPGRAPH_MAX_CONCURRENT_FETCHES", "-1"),
            ("APPGRAPH_DEBOUNCE_MS", ""),
        ])
        .unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.max_concurrent_fetches, None);
        assert_eq!(config.debounce_ms, 3000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(from_vars(&[("APPGRAPH_PAGE_SIZE", "0")]), Err(CoreError::ConfigError(_))));
        assert!(matches!(
            from_vars(&[("APPGRAPH_NOTIFICATION_BUFFER", "0")]),
            Err(CoreError::ConfigError(_))
        ));
        assert!(matches!(from_vars(&[("APPGRAPH_REMOTE_API_URL", " ")]), Err(CoreError::ConfigError(_))));
    }

    #[test]
    fn test_debounce_window_is_capped() {
        let max = MAX_DEBOUNCE_MS.to_string();
        assert_eq!(from_vars(&[("APPGRAPH_DEBOUNCE_MS", max.as_str())]).unwrap().debounce_ms, MAX_DEBOUNCE_MS);
        assert!(matches!(
            from_vars(&[("APPGRAPH_DEBOUNCE_MS", "18446744073709551615")]),
            Err(CoreError::ConfigError(_))
        ));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: PipelineConfig = serde_json::from_str(r#"{"page_size": 10}"#).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.remote_api_url, "http://localhost:8090");
        assert_eq!(config.notification_buffer, 64);
    }
}
