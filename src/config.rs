//! Configuration module for persistent settings.
//!
//! This module handles loading, saving, and validating application settings.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Environment variable overriding the settings file location.
pub const CONFIG_PATH_ENV: &str = "SIGNAL_BOOSTER_CONFIG";

/// Shortest allowed interval between status log lines.
const MIN_STATUS_INTERVAL_MS: u64 = 10;

/// Longest accepted initial duration (one week).
pub const MAX_INITIAL_DURATION_MS: f64 = 7.0 * 24.0 * 60.0 * 60.0 * 1000.0;

/// Application settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Duration hint used for the first start, in milliseconds.
    pub initial_duration_ms: Option<f64>,
    /// How often the running timer's progress is logged.
    pub status_interval_ms: u64,
    /// Keybind file location, defaults to `keybinds.json` beside this file.
    pub keybinds_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_duration_ms: None,
            status_interval_ms: 1000,
            keybinds_path: None,
        }
    }
}

impl Config {
    /// Validate configuration values.
    /// Returns Ok(()) if valid, Err with descriptive message if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(hint) = self.initial_duration_ms {
            if !hint.is_finite() || hint <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "initial_duration_ms ({}) must be a positive number of milliseconds",
                    hint
                )));
            }
            if hint > MAX_INITIAL_DURATION_MS {
                return Err(ConfigError::ValidationError(format!(
                    "initial_duration_ms ({}) must not exceed {}ms",
                    hint, MAX_INITIAL_DURATION_MS
                )));
            }
        }

        if self.status_interval_ms < MIN_STATUS_INTERVAL_MS {
            return Err(ConfigError::ValidationError(format!(
                "status_interval_ms ({}) must be at least {}ms",
                self.status_interval_ms, MIN_STATUS_INTERVAL_MS
            )));
        }

        Ok(())
    }

    /// Resolved keybind file path.
    pub fn keybinds_path(&self) -> PathBuf {
        self.keybinds_path
            .clone()
            .unwrap_or_else(crate::keybinds::KeybindsFile::default_path)
    }
}

/// Configuration manager with file I/O.
pub struct ConfigManager {
    config: RwLock<Config>,
    path: PathBuf,
}

impl ConfigManager {
    /// Load configuration from file or use defaults.
    /// If the file doesn't exist, returns a manager with default config.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| {
                ConfigError::ParseError(format!("Failed to read config file: {}", e))
            })?;

            let config: Config = serde_json::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(format!("Invalid JSON: {}", e)))?;

            config.validate()?;
            config
        } else {
            Config::default()
        };

        Ok(Self {
            config: RwLock::new(config),
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to file using atomic write.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config = self.config.read().map_err(|_| {
            ConfigError::ValidationError("Failed to acquire read lock".to_string())
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&*config)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {}", e)))?;

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    /// Get current configuration.
    pub fn get(&self) -> Config {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|_| Config::default())
    }

    /// Update configuration with validation and persist it.
    pub fn update(&self, config: Config) -> Result<(), ConfigError> {
        config.validate()?;

        let mut current = self.config.write().map_err(|_| {
            ConfigError::ValidationError("Failed to acquire write lock".to_string())
        })?;
        *current = config;
        drop(current);

        self.save()
    }

    /// Get the config file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings path: `$SIGNAL_BOOSTER_CONFIG`, else `<config dir>/signal-booster/config.json`.
    pub fn default_path() -> PathBuf {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => config_dir().join("config.json"),
        }
    }
}

/// Get the config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("signal-booster"))
        .unwrap_or_else(|| PathBuf::from("signal-booster"))
}
