//! Infrastructure layer
//!
//! Handles I/O with the outside world: platform directories, toolchain
//! feeds, and external processes.

pub mod dirs;
pub mod process;
pub mod toolchain;
