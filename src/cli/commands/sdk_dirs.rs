//! SDK directories command implementation
//!
//! Implements `qibuild sdk-dirs`.

use anyhow::Result;

use crate::cli::session::Session;
use crate::cli::GlobalOptions;
use crate::core::graph::DependencyKind;

/// Execute the sdk-dirs command
pub fn execute(global: &GlobalOptions, project: Option<&str>, kinds: Vec<DependencyKind>) -> Result<()> {
    let session = Session::load(global)?;
    let project = session.one_project(project)?;
    let kinds = if kinds.is_empty() {
        session.context.dep_kinds.clone()
    } else {
        kinds
    };

    let dirs = session.solver().get_sdk_dirs(&project.name, &kinds)?;

    if global.json {
        println!("{}", serde_json::to_string_pretty(&dirs)?);
    } else {
        for dir in dirs {
            println!("{}", dir.display());
        }
    }
    Ok(())
}
