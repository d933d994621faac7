//! Error types for qibuild
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Dependency resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Circular dependency detected
    #[error("Circular dependency detected: {}", chain.join(" -> "))]
    CycleDetected { chain: Vec<String> },

    /// A requested root is neither a project nor a package
    #[error("Unknown project or package: '{name}'")]
    AmbiguousRootName { name: String },

    /// Missing transitive dependency
    ///
    /// Never returned as an `Err`: partial toolchains are expected, so the
    /// solver reports these as diagnostics alongside a successful result.
    #[error("Missing dependency: '{name}' required by '{required_by}'")]
    UnresolvedDependency { name: String, required_by: String },
}

/// Build scheduling errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// The build action failed for a project
    #[error("Build failed for project '{project}': {error}")]
    BuildFailed { project: String, error: String },

    /// Build ordering could not be computed
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Build command could not be found
    #[error("Build program '{program}' not found in PATH")]
    ProgramNotFound { program: String },

    /// Build command is empty or malformed
    #[error("Invalid build command: {message}")]
    InvalidCommand { message: String },
}

/// Worktree manifest errors
#[derive(Error, Debug)]
pub enum WorktreeError {
    /// No manifest at the expected location
    #[error("No qibuild.toml found in '{path}' or any parent directory")]
    NotFound { path: PathBuf },

    /// IO error while reading the manifest
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Manifest parse error
    #[error("Failed to parse '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Two projects share a name
    #[error("Project '{name}' is declared more than once")]
    DuplicateProject { name: String },

    /// Requested project does not exist
    #[error("Project '{name}' not found in worktree")]
    ProjectNotFound { name: String },
}

/// Toolchain feed errors
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// Toolchain feed not found
    #[error("Toolchain '{name}' not found (looked for '{path}')")]
    NotFound { name: String, path: PathBuf },

    /// IO error while reading the feed
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Feed parse error
    #[error("Failed to parse toolchain feed '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Two packages share a name
    #[error("Package '{name}' is declared more than once in toolchain '{toolchain}'")]
    DuplicatePackage { toolchain: String, name: String },
}
