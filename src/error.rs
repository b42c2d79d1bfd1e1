//! Error types for Signal Booster.
//!
//! This module defines custom error enums for each component,
//! providing descriptive error messages with context information.

use crate::keys::Key;
use thiserror::Error;

/// Errors raised while building a key chord.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChordError {
    #[error("A chord needs at least one key")]
    Empty,

    #[error("Key '{0}' appears more than once in the chord")]
    DuplicateKey(Key),
}

/// Errors related to the key event source.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to start key capture: {0}")]
    CaptureFailed(String),

    #[error("Key capture state lock was poisoned")]
    LockPoisoned,

    #[error("Invalid key event '{0}'")]
    InvalidEvent(String),

    #[error("Unknown key '{0}'")]
    UnknownKey(String),
}

/// Errors related to the timer service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Timer service is no longer running")]
    ServiceClosed,
}

/// Errors related to configuration and keybind files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at '{0}'")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to write configuration: {0}")]
    WriteError(#[from] std::io::Error),
}

/// Errors related to logging initialization.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Could not determine a data directory for log files")]
    DataDirectoryNotFound,

    #[error("Failed to create log directory '{path}': {source}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create log file appender: {0}")]
    AppenderCreationFailed(String),
}

/// Top-level application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
