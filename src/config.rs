//! Catalog Configuration
//!
//! Listener inbox sizing, overflow handling, content-validator mode and log
//! level. Loaded from a JSON file; every field has a default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::realtime::{DeliveryPolicy, OverflowPolicy, MAX_LISTENER_CAPACITY};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Catalog service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Inbox capacity per listener, at most `MAX_LISTENER_CAPACITY`
    /// (default: 64)
    #[serde(default = "default_listener_capacity")]
    pub listener_capacity: usize,

    /// How long a blocked delivery may wait (default: 5000)
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,

    /// Full-inbox handling (default: block)
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,

    /// Let artifact writes through when the content validator is
    /// unreachable (default: false)
    #[serde(default)]
    pub content_validator_permissive: bool,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listener_capacity() -> usize {
    64
}

fn default_delivery_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            listener_capacity: default_listener_capacity(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
            overflow_policy: OverflowPolicy::default(),
            content_validator_permissive: false,
            log_level: default_log_level(),
        }
    }
}

impl CatalogConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: CatalogConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.listener_capacity == 0 {
            return Err(ConfigError::Invalid("listener_capacity must be > 0".into()));
        }
        if self.listener_capacity > MAX_LISTENER_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "listener_capacity must be <= {}",
                MAX_LISTENER_CAPACITY
            )));
        }
        if self.overflow_policy == OverflowPolicy::Block && self.delivery_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "delivery_timeout_ms must be > 0 with the block overflow policy".into(),
            ));
        }
        self.severity()?;
        Ok(())
    }

    /// Parsed log level
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy::new(
            self.listener_capacity,
            Duration::from_millis(self.delivery_timeout_ms),
            self.overflow_policy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, value: serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join("catalogd.json");
        fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({}));

        let config = CatalogConfig::load(&path).unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.listener_capacity, 64);
        assert_eq!(config.delivery_timeout_ms, 5000);
        assert_eq!(config.overflow_policy, OverflowPolicy::Block);
        assert!(!config.content_validator_permissive);
    }

    #[test]
    fn test_config_overrides() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({
                "listener_capacity": 8,
                "overflow_policy": "disconnect",
                "content_validator_permissive": true,
                "log_level": "warn"
            }),
        );

        let config = CatalogConfig::load(&path).unwrap();
        assert_eq!(config.overflow_policy, OverflowPolicy::Disconnect);
        assert_eq!(config.severity().unwrap(), Severity::Warn);

        let policy = config.delivery_policy();
        assert_eq!(policy.capacity, 8);
        assert_eq!(policy.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({ "listener_capacity": 0 }));
        assert!(matches!(CatalogConfig::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_rejects_oversized_capacity() {
        let config = CatalogConfig {
            listener_capacity: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = CatalogConfig {
            listener_capacity: MAX_LISTENER_CAPACITY,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.delivery_policy().capacity, MAX_LISTENER_CAPACITY);
    }

    #[test]
    fn test_config_rejects_unknown_level() {
        let config = CatalogConfig {
            log_level: "chatty".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_unknown_policy() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, json!({ "overflow_policy": "drop-oldest" }));
        assert!(matches!(CatalogConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = CatalogConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }
}
