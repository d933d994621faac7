//! Worktree manifest (qibuild.toml) parsing
//!
//! The manifest sits at the worktree root and declares every source project
//! with its dependencies. String values may reference environment variables
//! using `${VAR}` syntax.
//!
//! ```toml
//! [worktree]
//! name = "robot"
//! toolchain = "linux64"
//! active = ["libfoo"]
//!
//! [[project]]
//! name = "hello"
//! path = "hello"
//! build_depends = ["world"]
//! run_depends = ["boost"]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::defaults::WORKTREE_MANIFEST;
use crate::core::graph::{DependencyKind, Project};
use crate::error::WorktreeError;

/// Parsed `qibuild.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeManifest {
    /// Worktree-wide settings
    #[serde(default)]
    pub worktree: WorktreeSection,

    /// Project declarations, in file order
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectEntry>,
}

/// `[worktree]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeSection {
    /// Display name
    pub name: Option<String>,

    /// Toolchain name or feed path
    pub toolchain: Option<String>,

    /// Projects that always win over packages of the same name
    #[serde(default)]
    pub active: Vec<String>,
}

/// One `[[project]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,

    /// Source directory, relative to the worktree root (defaults to the name)
    pub path: Option<String>,

    #[serde(default)]
    pub build_depends: Vec<String>,

    #[serde(default)]
    pub run_depends: Vec<String>,

    #[serde(default)]
    pub test_depends: Vec<String>,

    #[serde(default)]
    pub host_depends: Vec<String>,
}

impl ProjectEntry {
    fn depends(&self) -> [(DependencyKind, &[String]); 4] {
        [
            (DependencyKind::Build, self.build_depends.as_slice()),
            (DependencyKind::Runtime, self.run_depends.as_slice()),
            (DependencyKind::Test, self.test_depends.as_slice()),
            (DependencyKind::Host, self.host_depends.as_slice()),
        ]
    }
}

/// A loaded worktree: its root directory and manifest
#[derive(Debug, Clone)]
pub struct Worktree {
    root: PathBuf,
    manifest: WorktreeManifest,
}

impl Worktree {
    /// Find the worktree containing `start`, walking up parent directories
    ///
    /// # Errors
    ///
    /// Returns [`WorktreeError::NotFound`] if no directory on the way up holds
    /// a `qibuild.toml`.
    pub fn find(start: &Path) -> Result<Self, WorktreeError> {
        let root = start
            .ancestors()
            .find(|dir| dir.join(WORKTREE_MANIFEST).is_file())
            .ok_or_else(|| WorktreeError::NotFound {
                path: start.to_path_buf(),
            })?;
        Self::load(root)
    }

    /// Load the worktree rooted at `root`
    pub fn load(root: &Path) -> Result<Self, WorktreeError> {
        let path = root.join(WORKTREE_MANIFEST);
        if !path.is_file() {
            return Err(WorktreeError::NotFound {
                path: root.to_path_buf(),
            });
        }

        let content = fs::read_to_string(&path).map_err(|e| WorktreeError::IoError {
            path: path.clone(),
            error: e.to_string(),
        })?;

        tracing::debug!("Loading worktree manifest {}", path.display());
        Self::from_toml(root, &content).map_err(|e| match e {
            WorktreeError::ParseError { error, .. } => WorktreeError::ParseError { path, error },
            other => other,
        })
    }

    /// Parse manifest content for a worktree rooted at `root`
    ///
    /// Environment variables are substituted before the manifest is
    /// deserialized.
    pub fn from_toml(root: &Path, content: &str) -> Result<Self, WorktreeError> {
        let parse_error = |error: String| WorktreeError::ParseError {
            path: root.join(WORKTREE_MANIFEST),
            error,
        };

        let mut value: toml::Value = toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
        substitute_in_value(&mut value).map_err(parse_error)?;
        let manifest: WorktreeManifest = value
            .try_into()
            .map_err(|e: toml::de::Error| parse_error(e.to_string()))?;

        let mut seen = HashSet::new();
        for project in &manifest.projects {
            if !seen.insert(project.name.as_str()) {
                return Err(WorktreeError::DuplicateProject {
                    name: project.name.clone(),
                });
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            manifest,
        })
    }

    /// Worktree root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parsed manifest
    pub fn manifest(&self) -> &WorktreeManifest {
        &self.manifest
    }

    /// Display name, defaulting to the root directory name
    pub fn name(&self) -> String {
        self.manifest.worktree.name.clone().unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// Toolchain declared by the manifest
    pub fn toolchain(&self) -> Option<&str> {
        self.manifest.worktree.toolchain.as_deref()
    }

    /// Projects marked active by the manifest
    pub fn active_projects(&self) -> &[String] {
        &self.manifest.worktree.active
    }

    /// Project names, in declaration order
    pub fn project_names(&self) -> Vec<&str> {
        self.manifest.projects.iter().map(|p| p.name.as_str()).collect()
    }

    /// Source directory of a declared project
    pub fn src_dir(&self, entry: &ProjectEntry) -> PathBuf {
        let relative = entry.path.as_deref().unwrap_or(&entry.name);
        self.root.join(relative)
    }

    /// Build graph projects for the build configuration `config_name`
    ///
    /// Each project's SDK directory is `<src_dir>/build-<config_name>/sdk`.
    pub fn projects(&self, config_name: &str) -> Vec<Project> {
        self.manifest
            .projects
            .iter()
            .map(|entry| {
                let src_dir = self.src_dir(entry);
                let sdk_dir = src_dir.join(format!("build-{config_name}")).join("sdk");
                entry
                    .depends()
                    .into_iter()
                    .fold(Project::new(&entry.name, src_dir), |project, (kind, names)| {
                        project.with_depends(kind, names.iter().cloned())
                    })
                    .with_sdk_dir(sdk_dir)
            })
            .collect()
    }

    /// Check that every name is a declared project
    pub fn check_projects<S: AsRef<str>>(&self, names: &[S]) -> Result<(), WorktreeError> {
        let known: HashSet<&str> = self.project_names().into_iter().collect();
        match names.iter().find(|name| !known.contains(name.as_ref())) {
            Some(name) => Err(WorktreeError::ProjectNotFound {
                name: name.as_ref().to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Substitute `${VAR}` patterns with environment variable values
///
/// Unset variables expand to an empty string.
pub fn substitute_env_vars(input: &str) -> Result<String, String> {
    let re =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| format!("Invalid regex: {e}"))?;

    Ok(re
        .replace_all(input, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned())
}

fn substitute_in_value(value: &mut toml::Value) -> Result<(), String> {
    match value {
        toml::Value::String(s) => {
            *s = substitute_env_vars(s)?;
        }
        toml::Value::Array(arr) => {
            for item in arr.iter_mut() {
                substitute_in_value(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                substitute_in_value(v)?;
            }
        }
        _ => {}
    }
    Ok(())
}
