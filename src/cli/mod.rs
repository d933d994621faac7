//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;
pub mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser};

use commands::Commands;
use output::OutputConfig;

/// qibuild - build many CMake projects in dependency order
///
/// Resolves dependencies between the projects of a worktree and the
/// precompiled packages of a toolchain, then builds projects in parallel.
#[derive(Parser, Debug)]
#[command(name = "qibuild")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Worktree root (defaults to the closest parent holding qibuild.toml)
    #[arg(short, long, global = true, env = "QIBUILD_WORKTREE")]
    pub worktree: Option<PathBuf>,

    /// Toolchain name or path to a toolchain feed
    #[arg(short, long, global = true)]
    pub toolchain: Option<String>,

    /// Build projects from source even when the toolchain has a package
    #[arg(long, global = true)]
    pub prefer_source: bool,
}

impl GlobalOptions {
    /// Output settings derived from the flags
    pub fn output(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.json, self.verbose)
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        if let Some(cmd) = self.command {
            cmd.run(&self.global)
        } else {
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
