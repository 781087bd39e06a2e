//! Engine and logging configuration.
//!
//! # Responsibility
//! - Provide deserializable configuration with sensible defaults.
//! - Validate configuration before any engine or logger is built.
//!
//! # Invariants
//! - `cache_capacity` is strictly positive after validation.

use crate::dispatch::cache::DEFAULT_CACHE_CAPACITY;
use crate::logging::{default_log_level, parse_level, parse_log_dir};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::NonZeroUsize;

/// Dispatch engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of cached bindings before LRU eviction.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_cache_capacity(cache_capacity: usize) -> Self {
        Self { cache_capacity }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache_capacity_non_zero().map(|_| ())
    }

    pub(crate) fn cache_capacity_non_zero(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.cache_capacity).ok_or(ConfigError::ZeroCacheCapacity)
    }
}

/// File logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: String::new(),
        }
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level(&self.level).map_err(|err| ConfigError::InvalidLogging(err.to_string()))?;
        parse_log_dir(&self.log_dir).map_err(|err| ConfigError::InvalidLogging(err.to_string()))?;
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroCacheCapacity,
    InvalidLogging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroCacheCapacity => write!(f, "cache_capacity must be greater than zero"),
            Self::InvalidLogging(message) => write!(f, "invalid logging config: {message}"),
        }
    }
}

impl Error for ConfigError {}
