//! qibuild - dependency resolution and parallel builds for CMake worktrees
//!
//! A worktree holds many source projects that depend on each other and on
//! precompiled packages from a toolchain. This library resolves those
//! dependencies into a stable build order and runs the builds on a pool of
//! worker threads.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic: graph, solver, scheduler, manifests
//! - [`infra`] - Infrastructure layer (filesystem, toolchains, processes)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
