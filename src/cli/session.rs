//! Per-invocation state shared by the commands
//!
//! Loads the worktree, the global configuration and the toolchain once, and
//! builds the dependency graph and build context from them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::GlobalOptions;
use crate::config::defaults::{DEFAULT_CONFIG_NAME, TOOLCHAIN_FEED};
use crate::core::context::BuildContext;
use crate::core::global_config::GlobalConfig;
use crate::core::graph::{BuildGraph, Project};
use crate::core::solver::DepsSolver;
use crate::core::worktree::Worktree;
use crate::infra::dirs::QibuildDirs;
use crate::infra::toolchain::Toolchain;

/// Everything a command needs
#[derive(Debug)]
pub struct Session {
    pub worktree: Worktree,
    pub toolchain: Option<Toolchain>,
    pub config: GlobalConfig,
    pub context: BuildContext,
    pub graph: BuildGraph,
    cwd: PathBuf,
}

impl Session {
    /// Load the session described by the global options
    ///
    /// The toolchain comes from `--toolchain`, then the worktree manifest,
    /// then the global configuration.
    pub fn load(options: &GlobalOptions) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let cwd = cwd.canonicalize().unwrap_or(cwd);

        let worktree = match &options.worktree {
            Some(path) => {
                let root = path
                    .canonicalize()
                    .with_context(|| format!("Worktree {} does not exist", path.display()))?;
                Worktree::load(&root)?
            }
            None => Worktree::find(&cwd)?,
        };

        let dirs = QibuildDirs::new();
        let config = GlobalConfig::load(&dirs)?;

        let toolchain_name = options
            .toolchain
            .as_deref()
            .or_else(|| worktree.toolchain())
            .or_else(|| config.default_toolchain());
        let toolchain = toolchain_name
            .map(|name| resolve_toolchain(name, worktree.root(), &dirs))
            .transpose()?;

        let config_name = toolchain
            .as_ref()
            .map_or(DEFAULT_CONFIG_NAME, |t| t.name.as_str())
            .to_string();

        let context = BuildContext::from_global_config(&config)
            .with_prefer_source(options.prefer_source || config.prefer_source())
            .with_active_projects(worktree.active_projects().iter().cloned())
            .with_quiet(options.quiet || options.json)
            .with_config_name(config_name);

        let packages = toolchain
            .as_ref()
            .map(|t| t.packages.clone())
            .unwrap_or_default();
        let graph = BuildGraph::new(worktree.projects(&context.config_name), packages);

        tracing::info!(
            "Worktree {} ({} projects, {} packages, config {})",
            worktree.name(),
            graph.projects().len(),
            graph.packages().len(),
            context.config_name
        );

        Ok(Self {
            worktree,
            toolchain,
            config,
            context,
            graph,
            cwd,
        })
    }

    /// Solver over this session's graph
    pub fn solver(&self) -> DepsSolver<'_> {
        DepsSolver::new(&self.graph, &self.context)
    }

    /// Project whose source directory contains the current directory
    pub fn current_project(&self) -> Option<&Project> {
        self.graph
            .projects()
            .iter()
            .filter(|p| self.cwd.starts_with(&p.src_dir))
            .max_by_key(|p| p.src_dir.components().count())
    }

    /// Projects a command applies to
    ///
    /// Explicit names win; otherwise `--all` or no current project selects
    /// every project of the worktree.
    pub fn select_projects(&self, names: &[String], all: bool) -> Result<Vec<String>> {
        if !names.is_empty() {
            self.worktree.check_projects(names)?;
            return Ok(names.to_vec());
        }
        if !all {
            if let Some(project) = self.current_project() {
                return Ok(vec![project.name.clone()]);
            }
        }
        Ok(self.graph.projects().iter().map(|p| p.name.clone()).collect())
    }

    /// Exactly one project, explicit or current
    pub fn one_project(&self, name: Option<&str>) -> Result<&Project> {
        match name {
            Some(name) => {
                self.worktree.check_projects(&[name])?;
                self.graph
                    .project(name)
                    .with_context(|| format!("Project '{name}' not found"))
            }
            None => self
                .current_project()
                .context("Not inside a project: pass a project name"),
        }
    }
}

fn resolve_toolchain(name: &str, root: &Path, dirs: &QibuildDirs) -> Result<Toolchain> {
    // Relative feed paths in the manifest are relative to the worktree root.
    let in_worktree = root.join(name);
    let name = if in_worktree.is_file() || in_worktree.join(TOOLCHAIN_FEED).is_file() {
        in_worktree.display().to_string()
    } else {
        name.to_string()
    };
    Ok(Toolchain::resolve(&name, dirs)?)
}
