//! Space Configuration
//!
//! Defines options for a double space, loadable from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration result type.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration for a double space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Verify every double before resetting at teardown.
    pub verify_on_teardown: bool,

    /// Number of calls a `mock` declaration expects by default.
    pub mock_times: usize,

    /// Restore intercepted objects when the space is dropped.
    pub reset_on_drop: bool,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            verify_on_teardown: true,
            mock_times: 1,
            reset_on_drop: true,
        }
    }
}

impl SpaceConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }
}
