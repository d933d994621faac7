//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test worktree context
///
/// Creates a temporary directory holding a worktree, its toolchain and
/// isolated configuration directories.
pub struct TestProject {
    /// Temporary directory for the test worktree
    pub dir: TempDir,
}

impl TestProject {
    /// Create an empty worktree in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a worktree with the sample manifest, toolchain and project
    /// directories
    pub fn sample() -> Self {
        let project = Self::new();
        project.create_file("qibuild.toml", SAMPLE_MANIFEST);
        project.create_file("toolchains/linux64/toolchain.toml", SAMPLE_TOOLCHAIN);
        for name in ["world", "hello", "app", "codegen"] {
            project.create_dir(name);
        }
        project.create_dir("toolchains/linux64/boost");
        project
    }

    /// Get the path to the worktree root
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the worktree
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the worktree
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the worktree
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the worktree
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Run qibuild from the worktree root with isolated config directories
    pub fn run(&self, args: &[&str]) -> Output {
        self.run_in(".", args)
    }

    /// Run qibuild from a subdirectory of the worktree
    pub fn run_in(&self, subdir: &str, args: &[&str]) -> Output {
        let root = self.path();
        Command::new(env!("CARGO_BIN_EXE_qibuild"))
            .current_dir(root.join(subdir))
            .env("QIBUILD_CONFIG_DIR", root.join(".config"))
            .env("QIBUILD_DATA_DIR", root.join(".data"))
            .env_remove("QIBUILD_WORKTREE")
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute qibuild")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard output as lines
#[allow(dead_code)]
pub fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Assert success, printing stderr otherwise
#[allow(dead_code)]
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "qibuild failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Sample worktree manifest
///
/// `app -> hello -> world` at build time, `hello -> boost` at run time,
/// `app` needs the `codegen` host tool.
#[allow(dead_code)]
pub const SAMPLE_MANIFEST: &str = r#"
[worktree]
name = "robot"
toolchain = "toolchains/linux64"

[[project]]
name = "world"

[[project]]
name = "hello"
build_depends = ["world"]
run_depends = ["boost"]

[[project]]
name = "app"
build_depends = ["hello"]
host_depends = ["codegen"]

[[project]]
name = "codegen"
"#;

/// Sample toolchain feed
#[allow(dead_code)]
pub const SAMPLE_TOOLCHAIN: &str = r#"
[toolchain]
name = "linux64"
target = "x86_64-linux-gnu"

[[package]]
name = "boost"
version = "1.77.0"
"#;
