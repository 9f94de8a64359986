//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/mindlog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/mindlog/` (~/.config/mindlog/)
//! - Data: `$XDG_DATA_HOME/mindlog/` (~/.local/share/mindlog/)
//! - State/Logs: `$XDG_STATE_HOME/mindlog/` (~/.local/state/mindlog/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Statistics window defaults
    #[serde(default)]
    pub stats: StatsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default windows for the period and progress reports
#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    /// Weeks covered by the weekly report
    #[serde(default = "default_weeks")]
    pub default_weeks: u32,

    /// Months (30-day units) covered by the monthly report
    #[serde(default = "default_months")]
    pub default_months: u32,

    /// Days covered by the progress report
    #[serde(default = "default_progress_days")]
    pub default_progress_days: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            default_weeks: default_weeks(),
            default_months: default_months(),
            default_progress_days: default_progress_days(),
        }
    }
}

impl StatsConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.default_weeks == 0 {
            return Err(Error::Config(
                "stats.default_weeks must be at least 1".to_string(),
            ));
        }
        if self.default_months == 0 {
            return Err(Error::Config(
                "stats.default_months must be at least 1".to_string(),
            ));
        }
        if self.default_progress_days == 0 {
            return Err(Error::Config(
                "stats.default_progress_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_weeks() -> u32 {
    4
}

fn default_months() -> u32 {
    6
}

fn default_progress_days() -> u32 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.stats.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/mindlog/config.toml` (~/.config/mindlog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("mindlog").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/mindlog/` (~/.local/share/mindlog/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("mindlog")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/mindlog/` (~/.local/state/mindlog/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("mindlog")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/mindlog/data.db` (~/.local/share/mindlog/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stats.default_weeks, 4);
        assert_eq!(config.stats.default_months, 6);
        assert_eq!(config.stats.default_progress_days, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[stats]
default_weeks = 8
default_progress_days = 14

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.stats.default_weeks, 8);
        assert_eq!(config.stats.default_months, 6);
        assert_eq!(config.stats.default_progress_days, 14);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_stats_config_validation() {
        assert!(StatsConfig::default().validate().is_ok());

        let config = StatsConfig {
            default_weeks: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_zero_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[stats]\ndefault_months = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
