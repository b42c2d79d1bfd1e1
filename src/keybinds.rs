//! Persisted keybinds.
//!
//! The file is a JSON array of `{"action": ..., "keys": [...]}` records.
//! A missing, unparsable or invalid file is never fatal: the default
//! bindings are used instead.

use crate::error::ConfigError;
use crate::facade::TimerAction;
use crate::keys::Key;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the keybind list inside the config directory.
pub const KEYBINDS_FILE: &str = "keybinds.json";

/// One action and the keys that must be held together to trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundAction {
    pub action: TimerAction,
    pub keys: Vec<Key>,
}

impl BoundAction {
    pub fn new(action: TimerAction, keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            action,
            keys: keys.into_iter().collect(),
        }
    }
}

/// Ordered list of keybinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeybindsFile {
    pub bound_actions: Vec<BoundAction>,
}

impl Default for KeybindsFile {
    /// Numpad minus rolls the timer over, numpad multiply cancels it.
    fn default() -> Self {
        Self {
            bound_actions: vec![
                BoundAction::new(TimerAction::Rollover, [Key::Subtract]),
                BoundAction::new(TimerAction::Cancel, [Key::Multiply]),
            ],
        }
    }
}

impl KeybindsFile {
    pub fn new(bound_actions: Vec<BoundAction>) -> Self {
        Self { bound_actions }
    }

    pub fn len(&self) -> usize {
        self.bound_actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound_actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundAction> {
        self.bound_actions.iter()
    }

    /// Every record needs at least one key and no key twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, bound) in self.bound_actions.iter().enumerate() {
            if bound.keys.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "keybind {} ({}) has no keys",
                    i, bound.action
                )));
            }
            for (j, key) in bound.keys.iter().enumerate() {
                if bound.keys[..j].contains(key) {
                    return Err(ConfigError::ValidationError(format!(
                        "keybind {} ({}) lists {} more than once",
                        i, bound.action, key
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate keybinds from JSON text.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let file: KeybindsFile = serde_json::from_str(contents)
            .map_err(|e| ConfigError::ParseError(format!("Invalid JSON: {}", e)))?;
        file.validate()?;
        Ok(file)
    }

    /// Read keybinds from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::ParseError(format!("Failed to read keybinds file: {}", e))
        })?;
        Self::from_json(&contents)
    }

    /// Read keybinds from `path`, falling back to the defaults on any problem.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(file) => {
                info!("Loaded {} keybinds from {:?}", file.len(), path);
                file
            }
            Err(ConfigError::FileNotFound(_)) => {
                info!("No keybinds file at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load keybinds from {:?}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Save keybinds to `path` using an atomic write.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize keybinds: {}", e)))?;

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, path)?;
        info!("Saved {} keybinds to {:?}", self.len(), path);
        Ok(())
    }

    /// Default location next to the settings file.
    pub fn default_path() -> PathBuf {
        crate::config::config_dir().join(KEYBINDS_FILE)
    }
}
