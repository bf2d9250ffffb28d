//! Shim configuration file parsing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runner::ds::error::ShimError;
use crate::runner::webpack::resolver::SearchOptions;

/// Patcher defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatcherConfig {
    /// Install a no-op method on empty slots before patching.
    pub force_patch: bool,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        PatcherConfig { force_patch: true }
    }
}

/// Logging setup for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` overrides it.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "warn".to_string(),
        }
    }
}

/// Complete shim configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Default options of the resolver's lookup helpers.
    pub resolver: SearchOptions,
    pub patcher: PatcherConfig,
    pub logging: LoggingConfig,
}

impl ShimConfig {
    /// Load configuration from a TOML file.
    ///
    /// Expected format, every key optional:
    /// ```toml
    /// [resolver]
    /// first = true
    /// default_export = true
    /// search_exports = false
    /// raw = false
    ///
    /// [patcher]
    /// force_patch = true
    ///
    /// [logging]
    /// filter = "bdshim=debug"
    /// ```
    pub fn load(path: &Path) -> Result<Self, ShimError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ShimError> {
        Ok(toml::from_str(content)?)
    }
}
