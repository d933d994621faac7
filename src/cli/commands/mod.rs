//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod depends;
pub mod list;
pub mod order;
pub mod sdk_dirs;

use anyhow::Result;
use clap::Subcommand;

use crate::cli::GlobalOptions;
use crate::core::graph::DependencyKind;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the projects of the worktree and the packages of the toolchain
    List,

    /// Print projects and packages in dependency order
    Order {
        /// Projects to resolve (defaults to the current project)
        projects: Vec<String>,

        /// Dependency kinds to follow (repeatable)
        #[arg(short, long = "kind", value_enum)]
        kinds: Vec<DependencyKind>,

        /// Print dependents instead of dependencies
        #[arg(long)]
        reverse: bool,

        /// Only the given projects, without dependencies
        #[arg(short, long)]
        single: bool,

        /// Resolve every project of the worktree
        #[arg(short, long)]
        all: bool,

        /// Print the host tools needed by the projects
        #[arg(long, conflicts_with = "reverse")]
        host: bool,
    },

    /// Display dependencies of a project
    Depends {
        /// Project name (defaults to the current project)
        project: Option<String>,

        /// Follow runtime dependencies instead of build dependencies
        #[arg(long)]
        runtime: bool,

        /// Only display direct dependencies
        #[arg(long)]
        direct: bool,

        /// Show projects that depend on the project
        #[arg(long)]
        reverse: bool,

        /// Display as a tree
        #[arg(long, conflicts_with = "graph")]
        tree: bool,

        /// Output in DOT graph format
        #[arg(long)]
        graph: bool,
    },

    /// Print the SDK directories a project builds against
    SdkDirs {
        /// Project name (defaults to the current project)
        project: Option<String>,

        /// Dependency kinds to follow (repeatable)
        #[arg(short, long = "kind", value_enum)]
        kinds: Vec<DependencyKind>,
    },

    /// Build projects in dependency order
    Build {
        /// Projects to build (defaults to the current project)
        projects: Vec<String>,

        /// Build only the given projects, without dependencies
        #[arg(short, long)]
        single: bool,

        /// Build every project of the worktree
        #[arg(short, long)]
        all: bool,

        /// Number of parallel jobs
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Command to run in each project (overrides the configured one)
        #[arg(last = true)]
        command: Vec<String>,
    },
}

impl Commands {
    /// Execute the command
    pub fn run(self, global: &GlobalOptions) -> Result<()> {
        match self {
            Self::List => list::execute(global),
            Self::Order {
                projects,
                kinds,
                reverse,
                single,
                all,
                host,
            } => {
                let options = order::OrderOptions {
                    projects,
                    kinds,
                    reverse,
                    single,
                    all,
                    host,
                };
                order::execute(global, options)
            }
            Self::Depends {
                project,
                runtime,
                direct,
                reverse,
                tree,
                graph,
            } => {
                let options = depends::DependsArgs {
                    project,
                    runtime,
                    direct,
                    reverse,
                    tree,
                    graph,
                };
                depends::execute(global, options)
            }
            Self::SdkDirs { project, kinds } => sdk_dirs::execute(global, project.as_deref(), kinds),
            Self::Build {
                projects,
                single,
                all,
                jobs,
                command,
            } => {
                let options = build::BuildOptions {
                    projects,
                    single,
                    all,
                    jobs,
                    command,
                };
                build::execute(global, options)
            }
        }
    }
}
