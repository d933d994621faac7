//! Order command implementation
//!
//! Implements `qibuild order` to print the resolved dependency order.

use anyhow::Result;

use crate::cli::session::Session;
use crate::cli::GlobalOptions;
use crate::core::graph::{DependencyKind, Node, Project};

/// Order options
pub struct OrderOptions {
    pub projects: Vec<String>,
    pub kinds: Vec<DependencyKind>,
    pub reverse: bool,
    pub single: bool,
    pub all: bool,
    pub host: bool,
}

/// Execute the order command
pub fn execute(global: &GlobalOptions, options: OrderOptions) -> Result<()> {
    let session = Session::load(global)?;
    let output = global.output();
    let roots = session.select_projects(&options.projects, options.all)?;
    let solver = session.solver();

    if options.host || options.single {
        let projects: Vec<&Project> = if options.host {
            solver.get_host_projects(&roots)?
        } else {
            roots.iter().filter_map(|name| session.graph.project(name)).collect()
        };

        if output.json {
            println!("{}", serde_json::to_string_pretty(&projects)?);
        } else {
            for project in projects {
                println!("{}", project.name);
            }
        }
        return Ok(());
    }

    let kinds = if options.kinds.is_empty() {
        session.context.dep_kinds.clone()
    } else {
        options.kinds
    };

    let result = solver.resolve(&roots, &kinds, options.reverse)?;
    for missing in result.unresolved() {
        output.warning(&missing.to_error().to_string());
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for node in result.nodes() {
        match node {
            Node::Project(project) => println!("{}", project.name),
            Node::Package(package) => println!("{} [package]", package.name),
        }
    }
    Ok(())
}
