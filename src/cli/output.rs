//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status messages, and errors to the user.

use indicatif::{ProgressBar, ProgressStyle};

/// How much the user wants to see
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Whether human-readable messages should be printed
    pub fn human(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Log filter level for the tracing subscriber
    pub fn log_level(&self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, _) => tracing::Level::DEBUG,
        }
    }

    /// Print a success line unless quiet or JSON
    pub fn success(&self, message: &str) {
        if self.human() {
            println!("{} {message}", status::SUCCESS);
        }
    }

    /// Print a warning to stderr unless quiet
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {message}", status::WARNING);
        }
    }

    /// Progress bar for a build of `total` projects, hidden unless human
    /// output is requested
    pub fn build_bar(&self, total: u64) -> ProgressBar {
        if self.human() {
            create_build_bar(total)
        } else {
            ProgressBar::hidden()
        }
    }
}

/// Create a progress bar for build steps
pub fn create_build_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} projects ({msg})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░");
    pb.set_style(style);
    pb
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";
}
