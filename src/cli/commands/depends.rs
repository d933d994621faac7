//! Depends command implementation
//!
//! Implements `qibuild depends` to display the dependencies of a project.

use anyhow::Result;

use crate::cli::session::Session;
use crate::cli::GlobalOptions;
use crate::core::tree::{DependencyTree, DependsOptions};

/// Depends arguments
pub struct DependsArgs {
    pub project: Option<String>,
    pub runtime: bool,
    pub direct: bool,
    pub reverse: bool,
    pub tree: bool,
    pub graph: bool,
}

/// Execute the depends command
pub fn execute(global: &GlobalOptions, args: DependsArgs) -> Result<()> {
    let session = Session::load(global)?;
    let project = session.one_project(args.project.as_deref())?;

    let options = DependsOptions {
        runtime: args.runtime,
        direct: args.direct,
        reverse: args.reverse,
    };
    let tree = DependencyTree::collect(&session.solver(), project, options)?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else if args.graph {
        print!("{}", tree.format_dot());
    } else {
        println!("{}", tree.label);
        if args.tree {
            print!("{}", tree.format_tree());
        } else {
            print!("{}", tree.format_compressed());
        }
    }
    Ok(())
}
