//! List command implementation
//!
//! Implements `qibuild list`.

use anyhow::Result;
use serde_json::json;

use crate::cli::session::Session;
use crate::cli::GlobalOptions;

/// Execute the list command
pub fn execute(global: &GlobalOptions) -> Result<()> {
    let session = Session::load(global)?;
    let output = global.output();
    let root = session.worktree.root();

    if output.json {
        let projects: Vec<_> = session
            .graph
            .projects()
            .iter()
            .map(|p| json!({ "name": p.name, "src_dir": p.src_dir, "sdk_dir": p.sdk_dir }))
            .collect();
        let packages: Vec<_> = session
            .graph
            .packages()
            .iter()
            .map(|p| json!({ "name": p.name, "version": p.version, "path": p.path }))
            .collect();
        let value = json!({
            "worktree": root,
            "toolchain": session.toolchain.as_ref().map(|t| &t.name),
            "projects": projects,
            "packages": packages,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Projects in {}:", root.display());
    for project in session.graph.projects() {
        let path = project.src_dir.strip_prefix(root).unwrap_or(&project.src_dir);
        println!("  {:<24} {}", project.name, path.display());
    }

    if let Some(toolchain) = &session.toolchain {
        println!("\nPackages in {}:", toolchain.name);
        for package in session.graph.packages() {
            println!(
                "  {:<24} {}",
                package.name,
                package.version.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}
