//! Toolchain feed loading
//!
//! A toolchain is a directory holding a `toolchain.toml` feed that lists the
//! precompiled packages it provides. Package paths are relative to the feed
//! directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::defaults::TOOLCHAIN_FEED;
use crate::core::graph::{DependencyKind, Package};
use crate::error::ToolchainError;
use crate::infra::dirs::QibuildDirs;

#[derive(Debug, Deserialize)]
struct FeedFile {
    #[serde(default)]
    toolchain: FeedHeader,
    #[serde(default, rename = "package")]
    packages: Vec<FeedPackage>,
}

#[derive(Debug, Default, Deserialize)]
struct FeedHeader {
    name: Option<String>,
    target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedPackage {
    name: String,
    version: Option<String>,
    path: Option<String>,
    #[serde(default)]
    run_depends: Vec<String>,
    #[serde(default)]
    build_depends: Vec<String>,
}

/// A loaded toolchain
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Toolchain name, used as the build configuration name
    pub name: String,
    /// Target platform, when the feed declares one
    pub target: Option<String>,
    /// Feed file the toolchain was read from
    pub feed: PathBuf,
    /// Packages, in feed order
    pub packages: Vec<Package>,
}

impl Toolchain {
    /// Locate and load a toolchain
    ///
    /// `name` is either the path to a feed file or toolchain directory, or
    /// the name of a toolchain installed under the data directory.
    pub fn resolve(name: &str, dirs: &QibuildDirs) -> Result<Self, ToolchainError> {
        let as_path = Path::new(name);
        let feed = if as_path.is_file() {
            as_path.to_path_buf()
        } else if as_path.join(TOOLCHAIN_FEED).is_file() {
            as_path.join(TOOLCHAIN_FEED)
        } else {
            dirs.toolchain_feed(name)
        };

        if !feed.is_file() {
            return Err(ToolchainError::NotFound {
                name: name.to_string(),
                path: feed,
            });
        }

        Self::load(&feed)
    }

    /// Load a toolchain from its feed file
    pub fn load(feed: &Path) -> Result<Self, ToolchainError> {
        let content = fs::read_to_string(feed).map_err(|e| ToolchainError::IoError {
            path: feed.to_path_buf(),
            error: e.to_string(),
        })?;

        let fallback_name = feed
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = feed.parent().unwrap_or_else(|| Path::new("."));

        Self::from_toml(&content, base, &fallback_name).map_err(|e| match e {
            ToolchainError::ParseError { error, .. } => ToolchainError::ParseError {
                path: feed.to_path_buf(),
                error,
            },
            other => other,
        })
        .map(|toolchain| Self {
            feed: feed.to_path_buf(),
            ..toolchain
        })
    }

    /// Parse feed content; package paths are resolved against `base`
    pub fn from_toml(content: &str, base: &Path, fallback_name: &str) -> Result<Self, ToolchainError> {
        let file: FeedFile = toml::from_str(content).map_err(|e| ToolchainError::ParseError {
            path: base.join(TOOLCHAIN_FEED),
            error: e.to_string(),
        })?;

        let name = file
            .toolchain
            .name
            .unwrap_or_else(|| fallback_name.to_string());

        let mut seen = HashSet::new();
        let mut packages = Vec::with_capacity(file.packages.len());
        for entry in file.packages {
            if !seen.insert(entry.name.clone()) {
                return Err(ToolchainError::DuplicatePackage {
                    toolchain: name,
                    name: entry.name,
                });
            }

            let path = base.join(entry.path.as_deref().unwrap_or(&entry.name));
            let mut package = Package::new(entry.name, path)
                .with_depends(DependencyKind::Runtime, entry.run_depends)
                .with_depends(DependencyKind::Build, entry.build_depends);
            if let Some(version) = entry.version {
                package = package.with_version(version);
            }
            packages.push(package);
        }

        tracing::debug!("Toolchain {} provides {} packages", name, packages.len());
        Ok(Self {
            name,
            target: file.toolchain.target,
            feed: base.join(TOOLCHAIN_FEED),
            packages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FEED: &str = r#"
[toolchain]
name = "linux64"
target = "linux64"

[[package]]
name = "boost"
version = "1.77.0"
run_depends = ["icu"]

[[package]]
name = "icu"
path = "libs/icu"
"#;

    #[test]
    fn test_parse_feed() {
        let toolchain = Toolchain::from_toml(FEED, Path::new("/tc"), "unused").unwrap();

        assert_eq!(toolchain.name, "linux64");
        assert_eq!(toolchain.target.as_deref(), Some("linux64"));
        assert_eq!(toolchain.packages.len(), 2);

        let boost = &toolchain.packages[0];
        assert_eq!(boost.version.as_deref(), Some("1.77.0"));
        assert_eq!(boost.path, PathBuf::from("/tc/boost"));
        assert!(boost.run_depends().contains("icu"));
        assert_eq!(toolchain.packages[1].path, PathBuf::from("/tc/libs/icu"));
    }

    #[test]
    fn test_name_defaults_to_directory() {
        let toolchain = Toolchain::from_toml("", Path::new("/tc/mac64"), "mac64").unwrap();
        assert_eq!(toolchain.name, "mac64");
        assert!(toolchain.packages.is_empty());
    }

    #[test]
    fn test_duplicate_package_is_an_error() {
        let content = r#"
[[package]]
name = "zlib"

[[package]]
name = "zlib"
"#;
        let result = Toolchain::from_toml(content, Path::new("/tc"), "tc");
        assert!(matches!(result, Err(ToolchainError::DuplicatePackage { name, .. }) if name == "zlib"));
    }

    #[test]
    fn test_resolve_by_name_in_data_dir() {
        let temp = TempDir::new().unwrap();
        let dirs = QibuildDirs::with_paths(temp.path().join("cfg"), temp.path().join("data"));
        let feed = dirs.toolchain_feed("linux64");
        fs::create_dir_all(feed.parent().unwrap()).unwrap();
        fs::write(&feed, FEED).unwrap();

        let toolchain = Toolchain::resolve("linux64", &dirs).unwrap();

        assert_eq!(toolchain.feed, feed);
        assert_eq!(
            toolchain.packages[0].path,
            dirs.toolchains_dir().join("linux64").join("boost")
        );
    }

    #[test]
    fn test_resolve_by_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(TOOLCHAIN_FEED), FEED).unwrap();
        let dirs = QibuildDirs::with_paths("/nonexistent", "/nonexistent");

        let toolchain = Toolchain::resolve(&temp.path().display().to_string(), &dirs).unwrap();

        assert_eq!(toolchain.name, "linux64");
    }

    #[test]
    fn test_resolve_missing_toolchain() {
        let dirs = QibuildDirs::with_paths("/nonexistent", "/nonexistent");
        let result = Toolchain::resolve("nope", &dirs);
        assert!(matches!(result, Err(ToolchainError::NotFound { .. })));
    }
}
