//! Dependency solver
//!
//! Turns "these roots, these dependency kinds" into an ordered list of source
//! projects and toolchain packages.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::context::BuildContext;
use crate::core::graph::{BuildGraph, DependencyKind, Node, Package, Precedence, Project};
use crate::core::sort::{topological_sort, Adjacency};
use crate::error::ResolverError;

/// A dependency name that matched neither a project nor a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    /// Missing name
    pub name: String,
    /// First resolved node declaring it
    pub required_by: String,
}

impl Unresolved {
    /// Structured diagnostic for this name
    pub fn to_error(&self) -> ResolverError {
        ResolverError::UnresolvedDependency {
            name: self.name.clone(),
            required_by: self.required_by.clone(),
        }
    }
}

/// A resolved node, as serialized
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ResolvedNode<'g> {
    Project(&'g Project),
    Package(&'g Package),
}

impl<'g> From<Node<'g>> for ResolvedNode<'g> {
    fn from(node: Node<'g>) -> Self {
        match node {
            Node::Project(project) => Self::Project(project),
            Node::Package(package) => Self::Package(package),
        }
    }
}

/// Outcome of a resolve call
///
/// Nodes are ordered so that dependencies always come before dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionResult<'g> {
    nodes: Vec<Node<'g>>,
    unresolved: Vec<Unresolved>,
}

impl<'g> ResolutionResult<'g> {
    /// Every resolved node, projects and packages interleaved
    pub fn nodes(&self) -> &[Node<'g>] {
        &self.nodes
    }

    /// Resolved projects, in order
    pub fn projects(&self) -> Vec<&'g Project> {
        self.nodes
            .iter()
            .filter_map(|node| match *node {
                Node::Project(project) => Some(project),
                Node::Package(_) => None,
            })
            .collect()
    }

    /// Resolved packages, in order
    pub fn packages(&self) -> Vec<&'g Package> {
        self.nodes
            .iter()
            .filter_map(|node| match *node {
                Node::Package(package) => Some(package),
                Node::Project(_) => None,
            })
            .collect()
    }

    /// Names declared as dependencies but found nowhere
    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    /// Names of the resolved nodes, in order
    pub fn names(&self) -> Vec<&'g str> {
        self.nodes.iter().map(Node::name).collect()
    }

    /// Whether `name` was resolved, as a project or as a package
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.iter().any(|node| node.name() == name)
    }
}

impl Serialize for ResolutionResult<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let nodes: Vec<ResolvedNode<'_>> = self.nodes.iter().copied().map(Into::into).collect();
        let mut state = serializer.serialize_struct("ResolutionResult", 2)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("unresolved", &self.unresolved)?;
        state.end()
    }
}

/// Resolves dependencies across the projects of a worktree and the packages
/// of its toolchain
#[derive(Debug, Clone)]
pub struct DepsSolver<'g> {
    graph: &'g BuildGraph,
    precedence: Precedence,
}

impl<'g> DepsSolver<'g> {
    /// Create a solver using the precedence rule of `context`
    pub fn new(graph: &'g BuildGraph, context: &BuildContext) -> Self {
        Self::with_precedence(graph, context.precedence())
    }

    /// Create a solver with an explicit precedence rule
    pub fn with_precedence(graph: &'g BuildGraph, precedence: Precedence) -> Self {
        Self { graph, precedence }
    }

    /// The graph this solver reads
    pub fn graph(&self) -> &'g BuildGraph {
        self.graph
    }

    /// Resolve `roots` following the dependency `kinds`
    ///
    /// Forward resolution returns the roots and everything they need.
    /// Reverse resolution returns every node whose forward closure contains
    /// one of the roots (the roots themselves included).
    ///
    /// Reverse resolution forward-resolves each node of the graph in turn,
    /// which is quadratic in the number of nodes. Worktrees hold tens to a
    /// few hundred projects, so this stays cheap. Inverting the graph instead
    /// would not be equivalent: the precedence rule depends on which node is
    /// the root, so edges do not invert one to one. Dependents are ordered
    /// by the size of their own closure.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::AmbiguousRootName`] if a root is neither a project
    ///   nor a package
    /// - [`ResolverError::CycleDetected`] if the followed edges form a cycle
    pub fn resolve<S: AsRef<str>>(
        &self,
        roots: &[S],
        kinds: &[DependencyKind],
        reverse: bool,
    ) -> Result<ResolutionResult<'g>, ResolverError> {
        for root in roots {
            if !self.graph.contains(root.as_ref()) {
                return Err(ResolverError::AmbiguousRootName {
                    name: root.as_ref().to_string(),
                });
            }
        }

        if reverse {
            self.resolve_reverse(roots, kinds)
        } else {
            self.resolve_forward(roots, kinds)
        }
    }

    fn resolve_forward<S: AsRef<str>>(
        &self,
        roots: &[S],
        kinds: &[DependencyKind],
    ) -> Result<ResolutionResult<'g>, ResolverError> {
        let precedence = self
            .precedence
            .clone()
            .with_active(roots.iter().map(|r| r.as_ref().to_string()));
        let adjacency = self.graph.adjacency(kinds, &precedence);
        let sorted = topological_sort(&adjacency, roots)?;

        let mut result = ResolutionResult::default();
        for name in &sorted {
            match self.graph.get_node(name, &precedence) {
                Some(node) => result.nodes.push(node),
                None => {
                    let unresolved = Unresolved {
                        name: name.clone(),
                        required_by: first_dependent(&sorted, &adjacency, name),
                    };
                    warn!("{}", unresolved.to_error());
                    result.unresolved.push(unresolved);
                }
            }
        }

        debug!(
            "Resolved {:?} ({}): {:?}",
            roots.iter().map(AsRef::as_ref).collect::<Vec<_>>(),
            kinds_label(kinds),
            result.names()
        );
        Ok(result)
    }

    fn resolve_reverse<S: AsRef<str>>(
        &self,
        roots: &[S],
        kinds: &[DependencyKind],
    ) -> Result<ResolutionResult<'g>, ResolverError> {
        let mut dependents: Vec<(usize, Node<'g>)> = Vec::new();
        for name in self.graph.names() {
            let closure = self.resolve_forward(&[name], kinds)?;
            if !roots.iter().any(|root| closure.contains(root.as_ref())) {
                continue;
            }
            // The dependent is reported the way its own forward pass resolved it.
            if let Some(node) = closure.nodes.iter().copied().find(|n| n.name() == name) {
                dependents.push((closure.nodes.len(), node));
            }
        }

        // A dependency's closure is strictly smaller than its dependent's;
        // the stable sort keeps declaration order between equal sizes.
        dependents.sort_by_key(|(size, _)| *size);

        let result = ResolutionResult {
            nodes: dependents.into_iter().map(|(_, node)| node).collect(),
            unresolved: Vec::new(),
        };

        debug!(
            "Reverse dependencies of {:?} ({}): {:?}",
            roots.iter().map(AsRef::as_ref).collect::<Vec<_>>(),
            kinds_label(kinds),
            result.names()
        );
        Ok(result)
    }

    /// SDK directories `name` depends on, in resolution order
    ///
    /// Projects contribute their SDK directory, packages their installed
    /// tree. The node itself is left out.
    ///
    /// # Errors
    ///
    /// Same as [`DepsSolver::resolve`].
    pub fn get_sdk_dirs(
        &self,
        name: &str,
        kinds: &[DependencyKind],
    ) -> Result<Vec<PathBuf>, ResolverError> {
        self.get_sdk_dirs_among(name, kinds, &[name])
    }

    /// SDK directories of `name` when it is resolved together with `roots`
    ///
    /// Every root wins over a package of the same name, as it does when the
    /// roots are resolved in one call, so a dependent builds against the
    /// sibling projects built in the same run.
    ///
    /// # Errors
    ///
    /// Same as [`DepsSolver::resolve`].
    pub fn get_sdk_dirs_among<S: AsRef<str>>(
        &self,
        name: &str,
        kinds: &[DependencyKind],
        roots: &[S],
    ) -> Result<Vec<PathBuf>, ResolverError> {
        let precedence = self
            .precedence
            .clone()
            .with_active(roots.iter().map(|r| r.as_ref().to_string()));
        let result = Self::with_precedence(self.graph, precedence).resolve(&[name], kinds, false)?;
        Ok(result
            .nodes()
            .iter()
            .filter(|node| node.name() != name)
            .map(|node| node.sdk_dir().to_path_buf())
            .collect())
    }

    /// Projects listed as host dependencies anywhere in the closure of
    /// `roots`, in declaration order
    ///
    /// # Errors
    ///
    /// Same as [`DepsSolver::resolve`].
    pub fn get_host_projects<S: AsRef<str>>(
        &self,
        roots: &[S],
    ) -> Result<Vec<&'g Project>, ResolverError> {
        let kinds = [
            DependencyKind::Build,
            DependencyKind::Runtime,
            DependencyKind::Test,
        ];
        let result = self.resolve(roots, &kinds, false)?;

        let host_names: HashSet<&str> = result
            .projects()
            .into_iter()
            .flat_map(|project| project.host_depends().iter().map(String::as_str))
            .collect();

        Ok(self
            .graph
            .projects()
            .iter()
            .filter(|project| host_names.contains(project.name.as_str()))
            .collect())
    }
}

/// First node of `sorted` that declares `name` as a dependency
fn first_dependent(sorted: &[String], adjacency: &Adjacency, name: &str) -> String {
    sorted
        .iter()
        .find(|candidate| adjacency.get(*candidate).is_some_and(|deps| deps.contains(name)))
        .cloned()
        .unwrap_or_default()
}

fn kinds_label(kinds: &[DependencyKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::build_graph;
    use proptest::prelude::*;

    const BUILD: &[DependencyKind] = &[DependencyKind::Build];
    const RUNTIME: &[DependencyKind] = &[DependencyKind::Runtime];
    const BUILD_RUNTIME: &[DependencyKind] = &[DependencyKind::Build, DependencyKind::Runtime];

    fn names(projects: &[&Project]) -> Vec<String> {
        projects.iter().map(|p| p.name.clone()).collect()
    }

    fn package_names(packages: &[&Package]) -> Vec<String> {
        packages.iter().map(|p| p.name.clone()).collect()
    }

    fn hello_world() -> BuildGraph {
        BuildGraph::new(
            vec![
                Project::new("world", "/src/world"),
                Project::new("hello", "/src/hello")
                    .with_depends(DependencyKind::Build, ["world"])
                    .with_depends(DependencyKind::Runtime, ["boost"]),
            ],
            vec![Package::new("boost", "/toolchain/boost").with_version("1.77.0")],
        )
    }

    fn solver(graph: &BuildGraph) -> DepsSolver<'_> {
        DepsSolver::with_precedence(graph, Precedence::default())
    }

    #[test]
    fn test_build_deps_of_hello() {
        let graph = hello_world();
        let result = solver(&graph).resolve(&["hello"], BUILD, false).unwrap();

        assert_eq!(names(&result.projects()), vec!["world", "hello"]);
        assert!(result.packages().is_empty());
        assert!(result.unresolved().is_empty());
    }

    #[test]
    fn test_runtime_deps_of_hello() {
        let graph = hello_world();
        let result = solver(&graph).resolve(&["hello"], RUNTIME, false).unwrap();

        assert_eq!(names(&result.projects()), vec!["hello"]);
        assert_eq!(package_names(&result.packages()), vec!["boost"]);
    }

    #[test]
    fn test_chain_order() {
        let graph = BuildGraph::new(
            vec![
                Project::new("gtest", "/src/gtest"),
                Project::new("libfoo", "/src/libfoo").with_depends(DependencyKind::Build, ["gtest"]),
                Project::new("bar", "/src/bar").with_depends(DependencyKind::Build, ["libfoo"]),
            ],
            Vec::new(),
        );

        let result = solver(&graph).resolve(&["bar"], BUILD_RUNTIME, false).unwrap();

        assert_eq!(names(&result.projects()), vec!["gtest", "libfoo", "bar"]);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let graph = BuildGraph::new(
            vec![
                Project::new("a", "/src/a").with_depends(DependencyKind::Build, ["b"]),
                Project::new("b", "/src/b").with_depends(DependencyKind::Build, ["a"]),
            ],
            Vec::new(),
        );

        let err = solver(&graph).resolve(&["a"], BUILD, false).unwrap_err();

        assert_eq!(
            err,
            ResolverError::CycleDetected {
                chain: vec!["a".to_string(), "b".to_string(), "a".to_string()]
            }
        );
    }

    #[test]
    fn test_unknown_root_is_fatal() {
        let graph = hello_world();
        let err = solver(&graph).resolve(&["nope"], BUILD, false).unwrap_err();
        assert_eq!(
            err,
            ResolverError::AmbiguousRootName {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_transitive_dependency_is_reported() {
        let graph = BuildGraph::new(
            vec![Project::new("app", "/src/app").with_depends(DependencyKind::Build, ["qt"])],
            Vec::new(),
        );

        let result = solver(&graph).resolve(&["app"], BUILD, false).unwrap();

        assert_eq!(names(&result.projects()), vec!["app"]);
        assert_eq!(
            result.unresolved(),
            &[Unresolved {
                name: "qt".to_string(),
                required_by: "app".to_string()
            }]
        );
    }

    #[test]
    fn test_package_shadows_inactive_project() {
        let graph = BuildGraph::new(
            vec![
                Project::new("libfoo", "/src/libfoo"),
                Project::new("bar", "/src/bar").with_depends(DependencyKind::Build, ["libfoo"]),
            ],
            vec![Package::new("libfoo", "/toolchain/libfoo")],
        );

        let result = solver(&graph).resolve(&["bar"], BUILD, false).unwrap();
        assert_eq!(names(&result.projects()), vec!["bar"]);
        assert_eq!(package_names(&result.packages()), vec!["libfoo"]);

        let siblings = solver(&graph)
            .resolve(&["bar", "libfoo"], BUILD, false)
            .unwrap();
        assert_eq!(names(&siblings.projects()), vec!["libfoo", "bar"]);
        assert!(siblings.packages().is_empty());

        let prefer_source = DepsSolver::with_precedence(&graph, Precedence::new(true))
            .resolve(&["bar"], BUILD, false)
            .unwrap();
        assert_eq!(names(&prefer_source.projects()), vec!["libfoo", "bar"]);
    }

    #[test]
    fn test_package_dependencies_are_followed() {
        let graph = BuildGraph::new(
            vec![Project::new("app", "/src/app").with_depends(DependencyKind::Runtime, ["boost"])],
            vec![
                Package::new("icu", "/toolchain/icu"),
                Package::new("boost", "/toolchain/boost")
                    .with_depends(DependencyKind::Runtime, ["icu"]),
            ],
        );

        let result = solver(&graph).resolve(&["app"], RUNTIME, false).unwrap();

        assert_eq!(package_names(&result.packages()), vec!["icu", "boost"]);
    }

    #[test]
    fn test_single_closure_over_union_of_kinds() {
        // app -build-> tool -runtime-> libz: only reachable when both kinds
        // are followed from the start.
        let graph = BuildGraph::new(
            vec![
                Project::new("libz", "/src/libz"),
                Project::new("tool", "/src/tool").with_depends(DependencyKind::Runtime, ["libz"]),
                Project::new("app", "/src/app").with_depends(DependencyKind::Build, ["tool"]),
            ],
            Vec::new(),
        );
        let solver = solver(&graph);

        let build = solver.resolve(&["app"], BUILD, false).unwrap();
        let runtime = solver.resolve(&["app"], RUNTIME, false).unwrap();
        let both = solver.resolve(&["app"], BUILD_RUNTIME, false).unwrap();

        assert!(!build.contains("libz"));
        assert!(!runtime.contains("libz"));
        assert_eq!(names(&both.projects()), vec!["libz", "tool", "app"]);
    }

    #[test]
    fn test_reverse_dependencies() {
        let graph = BuildGraph::new(
            vec![
                Project::new("gtest", "/src/gtest"),
                Project::new("libfoo", "/src/libfoo").with_depends(DependencyKind::Build, ["gtest"]),
                Project::new("bar", "/src/bar").with_depends(DependencyKind::Build, ["libfoo"]),
                Project::new("other", "/src/other"),
            ],
            Vec::new(),
        );

        let result = solver(&graph).resolve(&["gtest"], BUILD, true).unwrap();

        assert_eq!(names(&result.projects()), vec!["gtest", "libfoo", "bar"]);
    }

    #[test]
    fn test_reverse_uses_requested_kinds_only() {
        let graph = hello_world();
        let solver = solver(&graph);

        let build = solver.resolve(&["boost"], BUILD, true).unwrap();
        let runtime = solver.resolve(&["boost"], RUNTIME, true).unwrap();

        assert!(!build.contains("hello"));
        assert!(runtime.contains("hello"));
    }

    #[test]
    fn test_reverse_with_shadowing_packages_is_not_a_cycle() {
        // Each project only reaches the other through its package.
        let graph = BuildGraph::new(
            vec![
                Project::new("a", "/src/a").with_depends(DependencyKind::Build, ["b"]),
                Project::new("b", "/src/b").with_depends(DependencyKind::Build, ["a"]),
            ],
            vec![Package::new("a", "/toolchain/a"), Package::new("b", "/toolchain/b")],
        );
        let solver = solver(&graph);

        assert_eq!(solver.resolve(&["a"], BUILD, false).unwrap().names(), vec!["b", "a"]);
        assert_eq!(solver.resolve(&["b"], BUILD, false).unwrap().names(), vec!["a", "b"]);

        let reverse = solver.resolve(&["b"], BUILD, true).unwrap();
        assert_eq!(reverse.names(), vec!["a", "b"]);
        assert_eq!(names(&reverse.projects()), vec!["a", "b"]);
    }

    #[test]
    fn test_sdk_dirs_among_siblings_prefer_sibling_project() {
        let graph = BuildGraph::new(
            vec![
                Project::new("libfoo", "/src/libfoo").with_sdk_dir("/src/libfoo/build-sys/sdk"),
                Project::new("bar", "/src/bar").with_depends(DependencyKind::Build, ["libfoo"]),
            ],
            vec![Package::new("libfoo", "/toolchain/libfoo")],
        );
        let solver = solver(&graph);

        assert_eq!(
            solver.get_sdk_dirs("bar", BUILD).unwrap(),
            vec![PathBuf::from("/toolchain/libfoo")]
        );
        assert_eq!(
            solver
                .get_sdk_dirs_among("bar", BUILD, &["bar", "libfoo"])
                .unwrap(),
            vec![PathBuf::from("/src/libfoo/build-sys/sdk")]
        );
    }

    #[test]
    fn test_sdk_dirs_in_resolution_order() {
        let graph = BuildGraph::new(
            vec![
                Project::new("world", "/src/world").with_sdk_dir("/build/world/sdk"),
                Project::new("hello", "/src/hello")
                    .with_depends(DependencyKind::Build, ["world", "boost"]),
            ],
            vec![Package::new("boost", "/toolchain/boost")],
        );

        let dirs = solver(&graph).get_sdk_dirs("hello", BUILD).unwrap();

        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/toolchain/boost"),
                PathBuf::from("/build/world/sdk")
            ]
        );
    }

    #[test]
    fn test_host_projects() {
        let graph = BuildGraph::new(
            vec![
                Project::new("protoc", "/src/protoc"),
                Project::new("lib", "/src/lib").with_depends(DependencyKind::Host, ["protoc"]),
                Project::new("app", "/src/app").with_depends(DependencyKind::Build, ["lib"]),
            ],
            Vec::new(),
        );

        let hosts = solver(&graph).get_host_projects(&["app"]).unwrap();

        assert_eq!(names(&hosts), vec!["protoc"]);
    }

    #[test]
    fn test_serialized_result_tags_nodes() {
        let graph = hello_world();
        let result = solver(&graph).resolve(&["hello"], RUNTIME, false).unwrap();

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["nodes"][0]["type"], "package");
        assert_eq!(json["nodes"][0]["version"], "1.77.0");
        assert_eq!(json["nodes"][1]["type"], "project");
        assert_eq!(json["nodes"][1]["name"], "hello");
        assert_eq!(json["unresolved"].as_array().map(Vec::len), Some(0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_build_closure_ignores_runtime_only_edges(graph in build_graph()) {
            let solver = solver(&graph);
            for root in graph.names() {
                let result = solver.resolve(&[root], BUILD, false).unwrap();
                let resolved: Vec<&str> = result.names();
                for name in &resolved {
                    if *name == root {
                        continue;
                    }
                    // Everything but the root must be the build dependency of
                    // another resolved node.
                    let precedence = Precedence::default().with_active([root]);
                    let reached = resolved.iter().any(|parent| {
                        graph
                            .get_node(parent, &precedence)
                            .is_some_and(|node| node.declared_deps(DependencyKind::Build).contains(*name))
                    });
                    prop_assert!(reached, "{} is not a build dependency in closure of {}", name, root);
                }
            }
        }

        #[test]
        fn prop_union_of_kinds_is_superset(graph in build_graph()) {
            let solver = solver(&graph);
            for root in graph.names() {
                let both = solver.resolve(&[root], BUILD_RUNTIME, false).unwrap();
                for kinds in [BUILD, RUNTIME] {
                    let single = solver.resolve(&[root], kinds, false).unwrap();
                    for name in single.names() {
                        prop_assert!(both.contains(name));
                    }
                }
            }
        }

        #[test]
        fn prop_reverse_is_adjoint_of_forward(graph in build_graph()) {
            let solver = solver(&graph);
            let names: Vec<&str> = graph.names().collect();
            for kinds in [BUILD, RUNTIME, BUILD_RUNTIME] {
                for a in &names {
                    let reverse = solver.resolve(&[*a], kinds, true).unwrap();
                    for b in &names {
                        let forward = solver.resolve(&[*b], kinds, false).unwrap();
                        prop_assert_eq!(reverse.contains(b), forward.contains(a));
                    }
                }
            }
        }

        #[test]
        fn prop_result_is_dependency_ordered(graph in build_graph()) {
            let solver = solver(&graph);
            for root in graph.names() {
                let result = solver.resolve(&[root], BUILD_RUNTIME, false).unwrap();
                let order = result.names();
                let precedence = Precedence::default().with_active([root]);
                for (i, name) in order.iter().enumerate() {
                    let node = graph.get_node(name, &precedence).unwrap();
                    for dep in node.dependencies().union_of(BUILD_RUNTIME) {
                        if let Some(j) = order.iter().position(|n| *n == dep) {
                            prop_assert!(j < i);
                        }
                    }
                }
            }
        }
    }
}
