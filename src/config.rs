use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{LedgerError, Result};
use crate::ledger::DEFAULT_CREDIBILITY_THRESHOLD;

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "audit-ledger.toml";

/// Prefix of the environment variables overriding file settings
pub const ENV_PREFIX: &str = "AUDIT_LEDGER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub log_filter: String,
    pub snapshot_path: Option<String>,
    pub credibility_threshold: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_filter: "audit_ledger=info".to_string(),
            snapshot_path: None,
            credibility_threshold: DEFAULT_CREDIBILITY_THRESHOLD,
        }
    }
}

impl LedgerConfig {
    /// Load `audit-ledger.toml` if present, then apply `AUDIT_LEDGER_*`
    /// environment overrides
    pub fn load() -> Result<Self> {
        let config = Self::build(File::with_name(DEFAULT_CONFIG_FILE).required(false))?;
        info!("Configuration loaded");
        Ok(config)
    }

    /// Load a specific config file, which must exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LedgerError::ConfigError(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let config = Self::build(File::from(path).required(true))?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: LedgerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.credibility_threshold.is_finite()
            || !(0.0..=100.0).contains(&self.credibility_threshold)
        {
            return Err(LedgerError::ConfigError(format!(
                "credibility_threshold must be between 0 and 100, got {}",
                self.credibility_threshold
            )));
        }
        if self.log_filter.trim().is_empty() {
            return Err(LedgerError::ConfigError(
                "log_filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.log_filter, "audit_ledger=info");
        assert_eq!(config.credibility_threshold, 50.0);
        assert!(config.snapshot_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        fs::write(
            &path,
            "snapshot_path = \"/var/lib/ledger/snapshot.json\"\ncredibility_threshold = 65.0\n",
        )
        .unwrap();

        let config = LedgerConfig::load_from(&path).unwrap();
        assert_eq!(
            config.snapshot_path.as_deref(),
            Some("/var/lib/ledger/snapshot.json")
        );
        assert_eq!(config.credibility_threshold, 65.0);
        assert_eq!(config.log_filter, "audit_ledger=info");
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempdir().unwrap();
        let result = LedgerConfig::load_from(temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(LedgerError::ConfigError(_))));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("ledger.toml");
        fs::write(&path, "credibility_threshold = 140.0\n").unwrap();

        let result = LedgerConfig::load_from(&path);
        assert!(matches!(result, Err(LedgerError::ConfigError(_))));
    }
}
