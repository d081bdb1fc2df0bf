//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Upper bound for the base retry delay
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Configuration for the translation service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base delay between request attempts, 0 retries immediately
    #[serde(default)]
    pub retry_delay_ms: u64,
    /// JSON catalog backing the in-memory API
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let retry_delay_ms = std::env::var("RETRY_DELAY_MS")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<u64>()?;

        let catalog_path = std::env::var("CATALOG_PATH").ok().map(PathBuf::from);

        let config = Self {
            retry_delay_ms,
            catalog_path,
        };
        config.validate()?;

        info!("Loaded service configuration from environment");
        Ok(config)
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(anyhow::anyhow!(
                "retry_delay_ms must not exceed {} (got {})",
                MAX_RETRY_DELAY_MS,
                self.retry_delay_ms
            ));
        }

        Ok(())
    }

    /// Delay to wait before the given 1-based attempt
    pub fn backoff_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 || self.retry_delay_ms == 0 {
            return None;
        }
        let factor = 2_u64.saturating_pow(attempt - 2);
        Some(Duration::from_millis(self.retry_delay_ms.saturating_mul(factor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = ServiceConfig {
            retry_delay_ms: 100,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = ServiceConfig {
            retry_delay_ms: MAX_RETRY_DELAY_MS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_is_monotonic() {
        let config = ServiceConfig {
            retry_delay_ms: 100,
            ..Default::default()
        };
        assert_eq!(config.backoff_before(1), None);
        assert_eq!(config.backoff_before(2), Some(Duration::from_millis(100)));
        assert_eq!(config.backoff_before(3), Some(Duration::from_millis(200)));

        assert_eq!(ServiceConfig::default().backoff_before(3), None);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");

        let config = ServiceConfig {
            retry_delay_ms: 250,
            catalog_path: Some(PathBuf::from("catalog.json")),
        };
        config.to_file(&path).unwrap();

        assert_eq!(ServiceConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.json");
        std::fs::write(&path, "{}").unwrap();

        assert_eq!(ServiceConfig::from_file(&path).unwrap(), ServiceConfig::default());
    }
}
