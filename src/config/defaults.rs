//! Default configuration values

/// Build configuration name used when no toolchain is active
pub const DEFAULT_CONFIG_NAME: &str = "sys";

/// Worktree manifest file name
pub const WORKTREE_MANIFEST: &str = "qibuild.toml";

/// Toolchain feed file name
pub const TOOLCHAIN_FEED: &str = "toolchain.toml";

/// Global config file name
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Command run in each project source directory by `qibuild build`
pub const DEFAULT_BUILD_COMMAND: &[&str] = &["cmake", "--build", "."];

/// Recursion limit of the dependency display
pub const MAX_DEPENDS_DEPTH: usize = 99;
