//! Platform-specific directory management
//!
//! Provides platform-specific paths for the config and data directories.
//! Follows the XDG Base Directory layout on Linux and standard locations on
//! macOS.
//!
//! Environment variables can override default directories:
//! - `QIBUILD_CONFIG_DIR` - Override config directory
//! - `QIBUILD_DATA_DIR` - Override data directory

use std::env;
use std::path::{Path, PathBuf};

use crate::config::defaults::{GLOBAL_CONFIG_FILE, TOOLCHAIN_FEED};

/// Environment variable names for directory overrides
pub const ENV_CONFIG_DIR: &str = "QIBUILD_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "QIBUILD_DATA_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "qi";

const TOOLCHAINS_SUBDIR: &str = "toolchains";

/// Platform-specific directory provider
#[derive(Debug, Clone)]
pub struct QibuildDirs {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl QibuildDirs {
    /// Create a new `QibuildDirs` instance
    ///
    /// Checks environment variables first, then falls back to platform defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_dir: Self::resolve_dir(ENV_CONFIG_DIR, dirs::config_dir, ".config"),
            data_dir: Self::resolve_dir(ENV_DATA_DIR, dirs::data_dir, ".local/share"),
        }
    }

    /// Use explicit directories
    #[must_use]
    pub fn with_paths(config_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Config directory
    ///
    /// - Linux: `$XDG_CONFIG_HOME/qi` or `~/.config/qi`
    /// - macOS: `~/Library/Application Support/qi`
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Data directory, holding installed toolchains
    ///
    /// - Linux: `$XDG_DATA_HOME/qi` or `~/.local/share/qi`
    /// - macOS: `~/Library/Application Support/qi`
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding one subdirectory per installed toolchain
    #[must_use]
    pub fn toolchains_dir(&self) -> PathBuf {
        self.data_dir.join(TOOLCHAINS_SUBDIR)
    }

    /// Feed file of the toolchain called `name`
    #[must_use]
    pub fn toolchain_feed(&self, name: &str) -> PathBuf {
        self.toolchains_dir().join(name).join(TOOLCHAIN_FEED)
    }

    /// Path to `config.toml` in the config directory
    #[must_use]
    pub fn global_config_path(&self) -> PathBuf {
        self.config_dir.join(GLOBAL_CONFIG_FILE)
    }

    fn resolve_dir(var: &str, platform: fn() -> Option<PathBuf>, home_fallback: &str) -> PathBuf {
        if let Ok(path) = env::var(var) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        platform()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(home_fallback)
                    .join(APP_NAME)
            })
    }
}

impl Default for QibuildDirs {
    fn default() -> Self {
        Self::new()
    }
}
