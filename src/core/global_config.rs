//! Global configuration management
//!
//! Reads user-wide settings from `config.toml` in the config directory:
//! default build options and the default toolchain.

use crate::infra::dirs::QibuildDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Global configuration error types
#[derive(Error, Debug)]
pub enum GlobalConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Global configuration for qibuild
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default build options
    #[serde(default)]
    pub build: BuildConfig,

    /// Toolchain settings
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

/// Default build options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Default number of parallel jobs
    pub jobs: Option<usize>,

    /// Always build projects from source, even when a package exists
    pub prefer_source: Option<bool>,

    /// Command run in each project directory by `qibuild build`
    pub command: Option<Vec<String>>,
}

/// Toolchain settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Toolchain used when neither the worktree nor the command line names one
    pub default: Option<String>,
}

impl GlobalConfig {
    /// Load global configuration from the config directory
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `GlobalConfigError::ParseError` if the config file exists but
    /// contains invalid TOML.
    pub fn load(dirs: &QibuildDirs) -> Result<Self, GlobalConfigError> {
        Self::load_from_path(&dirs.global_config_path())
    }

    /// Load global configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, GlobalConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| GlobalConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| GlobalConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Get the effective number of build jobs
    ///
    /// Returns the configured value if set, otherwise the number of CPUs.
    #[must_use]
    pub fn build_jobs(&self) -> usize {
        self.build.jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Whether projects always win over packages
    #[must_use]
    pub fn prefer_source(&self) -> bool {
        self.build.prefer_source.unwrap_or(false)
    }

    /// Get the effective build command
    #[must_use]
    pub fn build_command(&self) -> Vec<String> {
        self.build
            .command
            .clone()
            .filter(|command| !command.is_empty())
            .unwrap_or_else(|| {
                crate::config::defaults::DEFAULT_BUILD_COMMAND
                    .iter()
                    .map(|arg| (*arg).to_string())
                    .collect()
            })
    }

    /// Default toolchain, if any
    #[must_use]
    pub fn default_toolchain(&self) -> Option<&str> {
        self.toolchain.default.as_deref()
    }
}
