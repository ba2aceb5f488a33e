//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for rawq tools.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rawq_common::config::{ConfigLoader, ConfigError, RawqConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = RawqConfig::load(Path::new("rawq.toml"))?;
//!     config.validate()?;
//!     println!("Queue: {} ({} bytes)", config.queue.name, config.queue.capacity);
//!     Ok(())
//! }
//! ```

use crate::consts::{DEFAULT_CAPACITY, SHM_MAX_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across rawq tools.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "sensor-bridge"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Queue identity: base name of the five shm regions plus ring capacity.
///
/// # TOML Example
///
/// ```toml
/// [queue]
/// name = "sensor_stream"
/// capacity = 65536
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Base name; the regions are `<name>`, `<name>_len`, `<name>_head`,
    /// `<name>_tail` and `<name>_has_data`.
    pub name: String,

    /// Ring capacity in bytes.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl QueueConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `name` is empty or contains `/`
    /// - `capacity` is zero or above `SHM_MAX_SIZE`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "queue name cannot be empty".to_string(),
            ));
        }
        if self.name.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "queue name '{}' must not contain '/'",
                self.name
            )));
        }
        if self.capacity == 0 || self.capacity > SHM_MAX_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "queue capacity {} out of range 1..={}",
                self.capacity, SHM_MAX_SIZE
            )));
        }
        Ok(())
    }
}

/// Full configuration file accepted by the `rawq` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawqConfig {
    /// Logging and instance identity.
    pub shared: SharedConfig,
    /// Queue to serve or attach to.
    pub queue: QueueConfig,
}

impl RawqConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.queue.validate()
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `serde::de::DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
