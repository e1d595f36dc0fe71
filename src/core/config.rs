//! Configuration management for the span store.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Environment variable and CLI overrides (applied by `cli`)
//! - Validation and defaults

use crate::core::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Traces a mutable block holds before it is rotated out
pub const DEFAULT_BLOCK_CAPACITY: usize = 1024;

/// Immutable blocks retained before the oldest is evicted
pub const DEFAULT_MAX_IMMUTABLE_BLOCKS: usize = 1024;

/// Complete configuration for the span store binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration
    pub storage: StoreConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Synthetic load configuration
    pub load: LoadConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// Block sizing for an in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Distinct traces per mutable block
    pub block_capacity: usize,
    /// Retained immutable blocks
    pub max_immutable_blocks: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Include targets, thread ids and line numbers
    pub structured: bool,
}

/// Synthetic ingestion driven by the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Distinct traces to ingest
    pub traces: usize,
    /// Spans generated per trace
    pub spans_per_trace: usize,
    /// Concurrent writer tasks
    pub writers: usize,
    /// How often store statistics are logged
    #[serde(with = "humantime_serde")]
    pub report_interval: Duration,
    /// Limit used for the sample trace query
    pub query_limit: usize,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            max_immutable_blocks: DEFAULT_MAX_IMMUTABLE_BLOCKS,
        }
    }
}

impl StoreConfig {
    /// Validate block sizing
    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(StoreError::config("block_capacity must be greater than 0"));
        }
        if self.max_immutable_blocks == 0 {
            return Err(StoreError::config("max_immutable_blocks must be greater than 0"));
        }
        Ok(())
    }

    /// Upper bound on traces retained across all blocks
    pub fn retained_traces(&self) -> usize {
        self.block_capacity
            .saturating_mul(self.max_immutable_blocks.saturating_add(1))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
            structured: false,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            traces: 10_000,
            spans_per_trace: 4,
            writers: 4,
            report_interval: Duration::from_secs(1),
            query_limit: 10,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;

        if self.load.writers == 0 {
            return Err(StoreError::config("writers must be greater than 0"));
        }

        if self.load.spans_per_trace == 0 {
            return Err(StoreError::config("spans_per_trace must be greater than 0"));
        }

        if self.load.report_interval.is_zero() {
            return Err(StoreError::config("report_interval must be greater than 0"));
        }

        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder::default()
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| StoreError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Load configuration from a YAML file
    pub fn from_file(self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        self.from_yaml(&content)
    }

    /// Set traces per mutable block
    pub fn block_capacity(mut self, capacity: usize) -> Self {
        self.config.storage.block_capacity = capacity;
        self
    }

    /// Set retained immutable blocks
    pub fn max_immutable_blocks(mut self, blocks: usize) -> Self {
        self.config.storage.max_immutable_blocks = blocks;
        self
    }

    /// Set log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set synthetic trace count
    pub fn traces(mut self, traces: usize) -> Self {
        self.config.load.traces = traces;
        self
    }

    /// Set concurrent writers
    pub fn writers(mut self, writers: usize) -> Self {
        self.config.load.writers = writers;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
