//! Build command implementation
//!
//! Implements `qibuild build`: resolves the build dependencies of the
//! requested projects and runs the build command in each of them, in
//! parallel where the dependency graph allows.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::session::Session;
use crate::cli::GlobalOptions;
use crate::core::graph::{DependencyKind, Project};
use crate::core::scheduler::ParallelBuilder;
use crate::infra::process::BuildCommand;

/// Build options
pub struct BuildOptions {
    /// Projects to build
    pub projects: Vec<String>,
    /// Skip dependencies
    pub single: bool,
    /// Build every project
    pub all: bool,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
    /// Command override
    pub command: Vec<String>,
}

/// Execute the build command
pub fn execute(global: &GlobalOptions, options: BuildOptions) -> Result<()> {
    let mut session = Session::load(global)?;
    if let Some(jobs) = options.jobs {
        session.context = session.context.clone().with_num_workers(jobs);
    }

    let output = global.output();
    let roots = session.select_projects(&options.projects, options.all)?;
    let solver = session.solver();
    let kinds = [DependencyKind::Build];

    let projects: Vec<&Project> = if options.single {
        roots
            .iter()
            .filter_map(|name| session.graph.project(name))
            .collect()
    } else {
        let result = solver.resolve(&roots, &kinds, false)?;
        for missing in result.unresolved() {
            output.warning(&missing.to_error().to_string());
        }
        result.projects()
    };

    // Roots built in this run win over packages of the same name for every
    // project, not only for themselves.
    let mut sdk_dirs: HashMap<&str, Vec<PathBuf>> = HashMap::new();
    for project in &projects {
        let dirs = solver.get_sdk_dirs_among(&project.name, &kinds, &roots)?;
        sdk_dirs.insert(project.name.as_str(), dirs);
    }

    let command_line = if options.command.is_empty() {
        session.config.build_command()
    } else {
        options.command
    };
    let command = BuildCommand::new(&command_line, &session.context.programs)?
        .with_quiet(session.context.quiet);

    let builder = ParallelBuilder::prepare(&projects)?;
    tracing::info!(
        "Building {} projects with {} jobs",
        builder.len(),
        session.context.num_workers
    );

    let bar = output.build_bar(builder.len() as u64);
    let report = builder.run(session.context.num_workers, |project| {
        bar.set_message(project.name.clone());
        let dirs = sdk_dirs
            .get(project.name.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();
        command
            .run(project, dirs)
            .with_context(|| format!("while building {}", project.name))?;
        bar.inc(1);
        Ok(())
    });
    bar.finish_and_clear();
    let report = report?;

    if output.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "built": report.built }))?);
    } else {
        output.success(&format!("Built {} projects", report.built.len()));
    }
    Ok(())
}
