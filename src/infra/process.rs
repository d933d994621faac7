//! External process execution
//!
//! Locates programs on `PATH` and runs the per-project build command.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};

use crate::core::graph::Project;
use crate::error::BuildError;

/// Environment variables exported to the build command
pub mod env_vars {
    pub const PROJECT: &str = "QIBUILD_PROJECT";
    pub const SRC_DIR: &str = "QIBUILD_SRC_DIR";
    pub const SDK_DIR: &str = "QIBUILD_SDK_DIR";
    /// Dependency SDK directories, joined like `PATH`
    pub const SDK_DIRS: &str = "QIBUILD_SDK_DIRS";
}

/// Program lookup results, remembered for one invocation
///
/// Misses are cached as well, so a missing tool is searched for once.
#[derive(Debug, Default)]
pub struct ProgramCache {
    found: Mutex<HashMap<String, Option<PathBuf>>>,
}

impl ProgramCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Full path of `program`, searching `PATH` on first use
    pub fn find(&self, program: &str) -> Option<PathBuf> {
        let mut found = self.found.lock().unwrap_or_else(PoisonError::into_inner);
        found
            .entry(program.to_string())
            .or_insert_with(|| {
                let path = which::which(program).ok();
                tracing::debug!("Looked up program {}: {:?}", program, path);
                path
            })
            .clone()
    }

    /// Whether `program` has been looked up already
    pub fn is_cached(&self, program: &str) -> bool {
        self.found
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(program)
    }
}

impl Clone for ProgramCache {
    fn clone(&self) -> Self {
        let found = self.found.lock().unwrap_or_else(PoisonError::into_inner).clone();
        Self {
            found: Mutex::new(found),
        }
    }
}

/// The command run in each project's source directory
#[derive(Debug, Clone)]
pub struct BuildCommand {
    program: PathBuf,
    args: Vec<String>,
    quiet: bool,
}

impl BuildCommand {
    /// Resolve the program of `command` through `programs`
    ///
    /// # Errors
    ///
    /// - [`BuildError::InvalidCommand`] if `command` is empty
    /// - [`BuildError::ProgramNotFound`] if the program is not on `PATH`
    pub fn new(command: &[String], programs: &ProgramCache) -> Result<Self, BuildError> {
        let (program, args) = command.split_first().ok_or_else(|| BuildError::InvalidCommand {
            message: "build command is empty".to_string(),
        })?;

        let program = programs
            .find(program)
            .ok_or_else(|| BuildError::ProgramNotFound {
                program: program.clone(),
            })?;

        Ok(Self {
            program,
            args: args.to_vec(),
            quiet: false,
        })
    }

    /// Discard the command's standard output
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Resolved program path
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the command for `project`
    ///
    /// The command runs in the project's source directory with the project's
    /// SDK directory and its dependencies' SDK directories in the environment.
    pub fn run(&self, project: &Project, sdk_dirs: &[PathBuf]) -> Result<()> {
        if !project.src_dir.is_dir() {
            bail!(
                "source directory {} does not exist",
                project.src_dir.display()
            );
        }

        let joined = env::join_paths(sdk_dirs).context("SDK directory contains a separator")?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&project.src_dir)
            .env(env_vars::PROJECT, &project.name)
            .env(env_vars::SRC_DIR, &project.src_dir)
            .env(env_vars::SDK_DIR, &project.sdk_dir)
            .env(env_vars::SDK_DIRS, joined)
            .stdin(Stdio::null());
        if self.quiet {
            command.stdout(Stdio::null());
        }

        let status = command
            .status()
            .with_context(|| format!("failed to run {}", self.program.display()))?;

        if !status.success() {
            bail!("{} exited with {}", self.program.display(), status);
        }
        Ok(())
    }
}
