//! Configuration management for Flightlog Fetcher
//!
//! This module provides layered configuration loading: built-in defaults,
//! an optional TOML file, environment variables and finally CLI flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::layout::RemoteLayout;
use crate::app::transfer::TransferConfig;
use crate::constants::{env, files, remote};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Device connection settings
    pub connection: ConnectionConfig,
    /// Storage layout on the device
    pub remote: RemoteLayout,
    /// Local download settings
    pub transfer: TransferSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Device connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Connection string, e.g. `file:///media/sdcard`
    pub address: Option<String>,
}

/// Local download settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransferSettings {
    /// Directory receiving downloaded logs
    pub output_dir: PathBuf,
    /// Directory holding staging directories
    pub staging_dir: PathBuf,
    /// Name prefix of staging directories
    pub staging_prefix: String,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            staging_dir: PathBuf::from("."),
            staging_prefix: files::STAGING_PREFIX.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, else the user config file if present)
    /// 3. Environment variables
    ///
    /// CLI flags are applied afterwards by the caller.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_file_override {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound { path }),
            Some(path) => Self::load_from_file(&path).await?,
            None => match Self::default_config_path().filter(|path| path.exists()) {
                Some(path) => Self::load_from_file(&path).await?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup(env::ADDRESS).filter(|value| !value.is_empty()) {
            debug!("Address taken from {}", env::ADDRESS);
            self.connection.address = Some(address);
        }
        if let Some(output_dir) = lookup(env::OUTPUT_DIR).filter(|value| !value.is_empty()) {
            debug!("Output directory taken from {}", env::OUTPUT_DIR);
            self.transfer.output_dir = PathBuf::from(output_dir);
        }
    }

    /// Check values that cannot be caught by deserialization
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.remote.storage_root.starts_with(remote::SEPARATOR) {
            return Err(ConfigError::InvalidValue {
                field: "remote.storage_root".to_string(),
                value: self.remote.storage_root.clone(),
                reason: "Storage root must be an absolute device path".to_string(),
            });
        }

        for (field, value) in [
            ("remote.log_dir", &self.remote.log_dir),
            ("remote.config_dir", &self.remote.config_dir),
            ("remote.config_file", &self.remote.config_file),
            ("transfer.staging_prefix", &self.transfer.staging_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                    reason: "Value must not be empty".to_string(),
                });
            }
        }

        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: "Expected one of error, warn, info, debug, trace".to_string(),
            });
        }

        Ok(())
    }

    /// Connection string, if one was configured anywhere
    pub fn address(&self) -> ConfigResult<&str> {
        self.connection
            .address
            .as_deref()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "connection.address".to_string(),
                value: String::new(),
                reason: format!(
                    "Pass --address, set {} or add [connection] address to the config file",
                    env::ADDRESS
                ),
            })
    }

    /// Log level from the `[logging]` section
    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::WARN)
    }

    /// Runtime transfer settings
    pub fn transfer_config(&self, overwrite: bool) -> TransferConfig {
        TransferConfig {
            output_dir: self.transfer.output_dir.clone(),
            staging_parent: self.transfer.staging_dir.clone(),
            staging_prefix: self.transfer.staging_prefix.clone(),
            overwrite,
        }
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flightlog_fetcher").join("config.toml"))
    }

    /// Write a commented default configuration file
    ///
    /// An existing file is left untouched. Returns whether a file was written.
    pub async fn write_default_file(path: &Path) -> ConfigResult<bool> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, Self::generate_default_config_content()).await?;

        info!("Created default configuration file: {}", path.display());
        Ok(true)
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        let layout = RemoteLayout::default();

        format!(
            r#"# Flightlog Fetcher Configuration
# Values set here are overridden by environment variables and CLI flags.

[connection]
# Device connection string, e.g. a mounted SD card
# address = "file:///media/sdcard"

[remote]
# Storage mount on the device
storage_root = "{storage_root}"

# Log subtree, relative to the storage root
log_dir = "{log_dir}"

# Configuration directory and file, relative to the storage root
config_dir = "{config_dir}"
config_file = "{config_file}"

[transfer]
# Directory receiving downloaded logs
output_dir = "."

# Directory in which staging directories are created
staging_dir = "."

# Name prefix of staging directories
staging_prefix = "{staging_prefix}"

[logging]
# One of error, warn, info, debug, trace
level = "warn"
"#,
            storage_root = layout.storage_root,
            log_dir = layout.log_dir,
            config_dir = layout.config_dir,
            config_file = layout.config_file,
            staging_prefix = files::STAGING_PREFIX,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.connection.address, None);
        assert_eq!(config.remote.log_path(), "/fs/microsd/log");
        assert_eq!(config.transfer.staging_prefix, ".part_");
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_generation() {
        let content = AppConfig::generate_default_config_content();

        // Should be valid TOML and match the defaults
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("# Flightlog Fetcher Configuration"));
        assert!(content.contains("[remote]"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (env::ADDRESS, "file:///media/sd"),
            (env::OUTPUT_DIR, "/tmp/logs"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.address().unwrap(), "file:///media/sd");
        assert_eq!(config.transfer.output_dir, PathBuf::from("/tmp/logs"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|_| Some(String::new()));

        assert!(config.address().is_err());
        assert_eq!(config.transfer.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.remote.storage_root = "fs/microsd".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = AppConfig::default();
        config.transfer.staging_prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transfer_config() {
        let mut config = AppConfig::default();
        config.transfer.output_dir = PathBuf::from("out");

        let transfer = config.transfer_config(true);
        assert_eq!(transfer.output_dir, PathBuf::from("out"));
        assert_eq!(transfer.staging_prefix, ".part_");
        assert!(transfer.overwrite);
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        // Should fail when explicitly specified
        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_config_loading_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
[remote]
storage_root = "/fs/usb"

[logging]
level = "debug"
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load(Some(config_path)).await.unwrap();

        assert_eq!(config.remote.storage_root, "/fs/usb");
        assert_eq!(config.remote.log_dir, "log");
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }

    #[tokio::test]
    async fn test_config_loading_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        tokio::fs::write(&config_path, "[remote\nstorage_root = 1")
            .await
            .unwrap();

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_write_default_file_keeps_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        assert!(AppConfig::write_default_file(&path).await.unwrap());
        assert!(!AppConfig::write_default_file(&path).await.unwrap());

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with("# Flightlog Fetcher Configuration"));
    }
}
