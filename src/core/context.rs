//! Per-invocation build context
//!
//! Everything the solver and the scheduler need to know about the current
//! command: which dependency kinds to follow, how projects and packages take
//! precedence, how many workers to run. Built once from the global config and
//! the command line, then passed to constructors.

use std::collections::BTreeSet;

use crate::core::global_config::GlobalConfig;
use crate::core::graph::{DependencyKind, Precedence};
use crate::infra::process::ProgramCache;

/// Build context for one command invocation
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Dependency kinds followed when no explicit kinds are requested
    pub dep_kinds: Vec<DependencyKind>,
    /// Make projects always win over packages of the same name
    pub prefer_source: bool,
    /// Projects that win over packages of the same name
    pub active_projects: BTreeSet<String>,
    /// Number of parallel build workers
    pub num_workers: usize,
    /// Suppress progress and build tool output
    pub quiet: bool,
    /// Name of the build configuration, used in build directory names
    pub config_name: String,
    /// Programs looked up during this invocation
    pub programs: ProgramCache,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            dep_kinds: vec![DependencyKind::Build],
            prefer_source: false,
            active_projects: BTreeSet::new(),
            num_workers: 1,
            quiet: false,
            config_name: crate::config::defaults::DEFAULT_CONFIG_NAME.to_string(),
            programs: ProgramCache::new(),
        }
    }
}

impl BuildContext {
    /// Create a context from the global configuration
    pub fn from_global_config(config: &GlobalConfig) -> Self {
        Self {
            prefer_source: config.prefer_source(),
            num_workers: config.build_jobs(),
            ..Self::default()
        }
    }

    /// Set the dependency kinds to follow
    #[must_use]
    pub fn with_dep_kinds(mut self, kinds: Vec<DependencyKind>) -> Self {
        if !kinds.is_empty() {
            self.dep_kinds = kinds;
        }
        self
    }

    /// Force projects to always win over packages
    #[must_use]
    pub fn with_prefer_source(mut self, prefer_source: bool) -> Self {
        self.prefer_source = prefer_source;
        self
    }

    /// Mark projects as active
    #[must_use]
    pub fn with_active_projects<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_projects.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the number of workers (at least one)
    #[must_use]
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    /// Set quiet mode
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Set the build configuration name
    #[must_use]
    pub fn with_config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    /// Precedence rule derived from this context
    pub fn precedence(&self) -> Precedence {
        Precedence::new(self.prefer_source).with_active(self.active_projects.iter().cloned())
    }
}
