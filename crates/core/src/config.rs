//! Runtime configuration
//!
//! Built in code with the `with_*` builder methods, or read from TOML:
//!
//! ```toml
//! stack_limit = 200000
//! initial_capacity = 128
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default maximum number of live stack slots across all frames
pub const DEFAULT_STACK_LIMIT: usize = 1_000_000;

/// Default number of slots reserved when a stack is created
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse runtime config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid runtime config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Pushing past this many live slots raises "stack overflow"
    pub stack_limit: usize,

    pub initial_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_limit: DEFAULT_STACK_LIMIT,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = limit;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Parse configuration from a TOML string; missing keys keep defaults
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_limit == 0 {
            return Err(ConfigError::Invalid(
                "stack_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
