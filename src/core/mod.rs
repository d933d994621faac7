//! Core business logic module
//!
//! Dependency resolution and build scheduling for a worktree. Apart from
//! manifest loading, nothing here talks to the outside world: that belongs
//! in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`graph`] - Projects, packages and the precedence rule between them
//! - [`sort`] - Stable topological sort with cycle detection
//! - [`solver`] - Forward and reverse dependency resolution
//! - [`scheduler`] - Parallel build scheduling
//! - [`context`] - Per-invocation build context
//! - [`tree`] - Dependency display
//! - [`worktree`] - Worktree manifest (qibuild.toml) parsing
//! - [`global_config`] - Global configuration management

pub mod context;
pub mod global_config;
pub mod graph;
pub mod scheduler;
pub mod solver;
pub mod sort;
pub mod tree;
pub mod worktree;
