//! Dependency display
//!
//! Collects the dependency edges below (or above, with `reverse`) one
//! project and renders them as an indented tree, a compressed summary, or a
//! DOT graph.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::defaults::MAX_DEPENDS_DEPTH;
use crate::core::graph::{DependencyKind, Package, Project};
use crate::core::solver::DepsSolver;
use crate::error::ResolverError;

/// What to collect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependsOptions {
    /// Follow runtime edges instead of build edges
    pub runtime: bool,
    /// Stop after one level
    pub direct: bool,
    /// Collect dependents instead of dependencies
    pub reverse: bool,
}

impl DependsOptions {
    fn kind(self) -> DependencyKind {
        if self.runtime {
            DependencyKind::Runtime
        } else {
            DependencyKind::Build
        }
    }
}

/// One displayed edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    /// Nesting level, 0 for edges leaving the root
    pub depth: usize,
    pub is_package: bool,
    /// Whether `to` matched a project or package
    pub is_known: bool,
    /// Source directory or package path of `to`
    pub path: Option<PathBuf>,
}

/// Dependency edges of one project, in display order
#[derive(Debug, Clone, Serialize)]
pub struct DependencyTree {
    pub root: String,
    pub label: String,
    pub edges: Vec<DependencyEdge>,
}

impl DependencyTree {
    /// Collect the edges of `root`
    ///
    /// Forward edges are limited to the closure resolved by `solver`;
    /// packages come before projects at every level.
    ///
    /// # Errors
    ///
    /// Fails when resolving the closure of `root` fails.
    pub fn collect(
        solver: &DepsSolver<'_>,
        root: &Project,
        options: DependsOptions,
    ) -> Result<Self, ResolverError> {
        let kind = options.kind();
        let edges = if options.reverse {
            let mut collector = ReverseCollector {
                projects: solver
                    .graph()
                    .projects()
                    .iter()
                    .filter(|p| p.name != root.name)
                    .collect(),
                kind,
                direct: options.direct,
                edges: Vec::new(),
            };
            collector.collect(root, 0);
            collector.edges
        } else {
            let result = solver.resolve(&[root.name.as_str()], &[kind], false)?;
            let mut collector = ForwardCollector {
                projects: result
                    .projects()
                    .into_iter()
                    .filter(|p| p.name != root.name)
                    .map(|p| (p.name.as_str(), p))
                    .collect(),
                packages: result
                    .packages()
                    .into_iter()
                    .map(|p| (p.name.as_str(), p))
                    .collect(),
                kind,
                direct: options.direct,
                edges: Vec::new(),
            };
            collector.collect(root, 0);
            collector.edges
        };

        Ok(Self {
            root: root.name.clone(),
            label: label(&root.name, options),
            edges,
        })
    }

    /// Indented tree, one edge per line
    pub fn format_tree(&self) -> String {
        if self.edges.is_empty() {
            return "None\n".to_string();
        }

        let mut output = String::new();
        let mut ancestors_last: Vec<bool> = Vec::new();
        for (i, edge) in self.edges.iter().enumerate() {
            let is_last = self.is_last_sibling(i);
            ancestors_last.truncate(edge.depth);

            let mut prefix = String::new();
            for &last in &ancestors_last {
                prefix.push_str(if last { "    " } else { "│   " });
            }
            let connector = if is_last { "└── " } else { "├── " };

            let _ = write!(output, "{prefix}{connector}{}", edge.to);
            if edge.is_package {
                output.push_str(" [package]");
            }
            match (&edge.path, edge.is_known) {
                (Some(path), true) => {
                    let _ = write!(output, " ({})", path.display());
                }
                _ => output.push_str(" (not found)"),
            }
            output.push('\n');

            ancestors_last.push(is_last);
        }
        output
    }

    fn is_last_sibling(&self, index: usize) -> bool {
        let depth = self.edges[index].depth;
        self.edges[index + 1..]
            .iter()
            .take_while(|edge| edge.depth >= depth)
            .all(|edge| edge.depth > depth)
    }

    /// Projects and packages involved, grouped, with unknown names last
    pub fn format_compressed(&self) -> String {
        if self.edges.is_empty() {
            return "None\n".to_string();
        }

        let mut output = String::new();
        for (title, packages) in [("Projects", false), ("Packages", true)] {
            let group = self.edges.iter().filter(|e| e.is_package == packages);
            let known: BTreeSet<String> = group
                .clone()
                .filter(|e| e.is_known)
                .map(|e| {
                    e.path
                        .as_ref()
                        .map_or_else(|| e.to.clone(), |p| p.display().to_string())
                })
                .collect();
            let unknown: BTreeSet<&str> = group
                .filter(|e| !e.is_known)
                .map(|e| e.to.as_str())
                .collect();

            if known.is_empty() && unknown.is_empty() {
                continue;
            }
            let _ = writeln!(output, "  {title}");
            for entry in &known {
                let _ = writeln!(output, "    {entry}");
            }
            for name in &unknown {
                let _ = writeln!(output, "    {name} (not found)");
            }
        }
        output
    }

    /// DOT graph; packages are boxes, unknown names dotted
    pub fn format_dot(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "digraph \"{}\" {{", self.root);
        let _ = writeln!(output, "    label=\"{}\";", self.label);
        output.push('\n');

        let packages: BTreeSet<&str> = self
            .edges
            .iter()
            .filter(|e| e.is_package)
            .map(|e| e.to.as_str())
            .collect();
        for package in &packages {
            let _ = writeln!(output, "    \"{package}\" [shape=box];");
        }
        if !packages.is_empty() {
            output.push('\n');
        }

        let mut seen = BTreeSet::new();
        for edge in &self.edges {
            if !seen.insert((edge.from.as_str(), edge.to.as_str())) {
                continue;
            }
            let style = if edge.is_known { "solid" } else { "dotted" };
            let _ = writeln!(
                output,
                "    \"{}\" -> \"{}\" [style={}];",
                edge.from, edge.to, style
            );
        }

        output.push_str("}\n");
        output
    }
}

fn label(root: &str, options: DependsOptions) -> String {
    let mut label = root.to_string();
    label.push_str(if options.runtime {
        " run time"
    } else {
        " build time"
    });
    if options.direct {
        label.push_str(" direct");
    }
    label.push_str(if options.reverse {
        " reverse dependencies"
    } else {
        " dependencies"
    });
    label
}

struct ForwardCollector<'g> {
    projects: HashMap<&'g str, &'g Project>,
    packages: HashMap<&'g str, &'g Package>,
    kind: DependencyKind,
    direct: bool,
    edges: Vec<DependencyEdge>,
}

impl<'g> ForwardCollector<'g> {
    fn collect(&mut self, project: &Project, depth: usize) {
        if depth > MAX_DEPENDS_DEPTH {
            tracing::warn!("Probable recursion problem below {}", project.name);
            return;
        }

        let (mut packages, mut projects): (Vec<&String>, Vec<&String>) = project
            .depends
            .of_kind(self.kind)
            .iter()
            .partition(|name| self.packages.contains_key(name.as_str()));
        packages.sort();
        projects.sort();

        for name in packages.into_iter().chain(projects) {
            let mut edge = DependencyEdge {
                from: project.name.clone(),
                to: name.clone(),
                depth,
                is_package: false,
                is_known: false,
                path: None,
            };
            let mut next = None;
            if let Some(package) = self.packages.get(name.as_str()) {
                edge.is_package = true;
                edge.is_known = true;
                edge.path = Some(package.path.clone());
            } else if let Some(dependency) = self.projects.get(name.as_str()) {
                edge.is_known = true;
                edge.path = Some(dependency.src_dir.clone());
                next = Some(*dependency);
            }
            self.edges.push(edge);

            if let Some(dependency) = next.filter(|_| !self.direct) {
                self.collect(dependency, depth + 1);
            }
        }
    }
}

struct ReverseCollector<'g> {
    projects: Vec<&'g Project>,
    kind: DependencyKind,
    direct: bool,
    edges: Vec<DependencyEdge>,
}

impl<'g> ReverseCollector<'g> {
    fn collect(&mut self, project: &Project, depth: usize) {
        if depth > MAX_DEPENDS_DEPTH {
            tracing::warn!("Probable recursion problem above {}", project.name);
            return;
        }

        let dependents: Vec<&'g Project> = self
            .projects
            .iter()
            .copied()
            .filter(|p| p.depends.of_kind(self.kind).contains(&project.name))
            .collect();

        for dependent in dependents {
            self.edges.push(DependencyEdge {
                from: project.name.clone(),
                to: dependent.name.clone(),
                depth,
                is_package: false,
                is_known: true,
                path: Some(dependent.src_dir.clone()),
            });
            if !self.direct {
                self.collect(dependent, depth + 1);
            }
        }
    }
}
