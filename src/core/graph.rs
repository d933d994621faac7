//! Dependency graph model
//!
//! Holds the source projects of a worktree and the precompiled packages of
//! the active toolchain, together with their declared dependencies by kind.
//! A graph is built once per invocation and never mutated afterwards.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Why one node needs another
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Needed to compile (headers, libraries, CMake config files)
    Build,
    /// Needed to run (shared libraries, data, python modules)
    Runtime,
    /// Needed to run the tests only
    Test,
    /// A tool that has to run on the build host (code generators, compilers)
    Host,
}

impl DependencyKind {
    /// Every dependency kind, in declaration order
    pub const ALL: [Self; 4] = [Self::Build, Self::Runtime, Self::Test, Self::Host];
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Runtime => write!(f, "runtime"),
            Self::Test => write!(f, "test"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// Declared dependency names, one set per kind
///
/// Sets are ordered so every traversal visits names lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub build: BTreeSet<String>,
    #[serde(default)]
    pub runtime: BTreeSet<String>,
    #[serde(default)]
    pub test: BTreeSet<String>,
    #[serde(default)]
    pub host: BTreeSet<String>,
}

impl Dependencies {
    /// Names declared for one kind
    pub fn of_kind(&self, kind: DependencyKind) -> &BTreeSet<String> {
        match kind {
            DependencyKind::Build => &self.build,
            DependencyKind::Runtime => &self.runtime,
            DependencyKind::Test => &self.test,
            DependencyKind::Host => &self.host,
        }
    }

    /// Union of the names declared for several kinds
    pub fn union_of(&self, kinds: &[DependencyKind]) -> BTreeSet<String> {
        kinds
            .iter()
            .flat_map(|kind| self.of_kind(*kind).iter().cloned())
            .collect()
    }

    fn set_mut(&mut self, kind: DependencyKind) -> &mut BTreeSet<String> {
        match kind {
            DependencyKind::Build => &mut self.build,
            DependencyKind::Runtime => &mut self.runtime,
            DependencyKind::Test => &mut self.test,
            DependencyKind::Host => &mut self.host,
        }
    }
}

fn to_names<I, S>(names: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into)
}

/// A source project of the worktree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Project name, unique among projects
    pub name: String,
    /// Source directory
    pub src_dir: PathBuf,
    /// Directory exposing headers, libraries and binaries to dependents
    pub sdk_dir: PathBuf,
    /// Declared dependencies
    pub depends: Dependencies,
}

impl Project {
    /// Create a project with no dependencies
    ///
    /// The SDK directory defaults to `<src_dir>/build-sys/sdk`.
    pub fn new(name: impl Into<String>, src_dir: impl Into<PathBuf>) -> Self {
        let src_dir = src_dir.into();
        let sdk_dir = src_dir.join("build-sys").join("sdk");
        Self {
            name: name.into(),
            src_dir,
            sdk_dir,
            depends: Dependencies::default(),
        }
    }

    /// Set the SDK directory
    #[must_use]
    pub fn with_sdk_dir(mut self, sdk_dir: impl Into<PathBuf>) -> Self {
        self.sdk_dir = sdk_dir.into();
        self
    }

    /// Add dependencies of the given kind
    #[must_use]
    pub fn with_depends<I, S>(mut self, kind: DependencyKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.set_mut(kind).extend(to_names(names));
        self
    }

    /// Build-time dependency names
    pub fn build_depends(&self) -> &BTreeSet<String> {
        &self.depends.build
    }

    /// Runtime dependency names
    pub fn run_depends(&self) -> &BTreeSet<String> {
        &self.depends.runtime
    }

    /// Test dependency names
    pub fn test_depends(&self) -> &BTreeSet<String> {
        &self.depends.test
    }

    /// Host tool dependency names
    pub fn host_depends(&self) -> &BTreeSet<String> {
        &self.depends.host
    }
}

/// A precompiled package of the active toolchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    /// Package name, unique among packages
    pub name: String,
    /// Package version, as declared by the toolchain feed
    pub version: Option<String>,
    /// Installed tree
    pub path: PathBuf,
    /// Declared dependencies (usually runtime only)
    pub depends: Dependencies,
}

impl Package {
    /// Create a package with no dependencies
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: None,
            path: path.into(),
            depends: Dependencies::default(),
        }
    }

    /// Set the version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add dependencies of the given kind
    #[must_use]
    pub fn with_depends<I, S>(mut self, kind: DependencyKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends.set_mut(kind).extend(to_names(names));
        self
    }

    /// Runtime dependency names
    pub fn run_depends(&self) -> &BTreeSet<String> {
        &self.depends.runtime
    }
}

/// A resolved node: either a source project or a toolchain package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'g> {
    Project(&'g Project),
    Package(&'g Package),
}

impl<'g> Node<'g> {
    /// Node name
    pub fn name(&self) -> &'g str {
        match *self {
            Self::Project(project) => &project.name,
            Self::Package(package) => &package.name,
        }
    }

    /// Raw declared dependency names for one kind
    ///
    /// Returns an empty set when nothing is declared for that kind.
    pub fn declared_deps(&self, kind: DependencyKind) -> &'g BTreeSet<String> {
        match *self {
            Self::Project(project) => project.depends.of_kind(kind),
            Self::Package(package) => package.depends.of_kind(kind),
        }
    }

    /// All declared dependencies
    pub fn dependencies(&self) -> &'g Dependencies {
        match *self {
            Self::Project(project) => &project.depends,
            Self::Package(package) => &package.depends,
        }
    }

    /// Directory dependents should search for headers and libraries
    pub fn sdk_dir(&self) -> &'g Path {
        match *self {
            Self::Project(project) => &project.sdk_dir,
            Self::Package(package) => &package.path,
        }
    }

    /// Whether this node is a source project
    pub fn is_project(&self) -> bool {
        matches!(self, Self::Project(_))
    }
}

/// Rule deciding whether a name shared by a project and a package resolves
/// to the project or to the package
///
/// By default a toolchain package shadows a project of the same name, so a
/// slow in-source build can be replaced transparently by a precompiled one.
/// Names marked active (the roots of a resolve call, or projects the user
/// works on) keep resolving to the project. `prefer_source` makes projects
/// always win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precedence {
    prefer_source: bool,
    active: HashSet<String>,
}

impl Precedence {
    /// Create a precedence rule with no active names
    pub fn new(prefer_source: bool) -> Self {
        Self {
            prefer_source,
            active: HashSet::new(),
        }
    }

    /// Mark more names as active
    #[must_use]
    pub fn with_active<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active.extend(to_names(names));
        self
    }

    /// Whether projects always win
    pub fn prefer_source(&self) -> bool {
        self.prefer_source
    }

    /// Whether `name` is marked active
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    fn project_wins(&self, name: &str) -> bool {
        self.prefer_source || self.is_active(name)
    }
}

/// All projects and packages known to one invocation
#[derive(Debug, Clone, Default)]
pub struct BuildGraph {
    projects: Vec<Project>,
    packages: Vec<Package>,
    project_index: HashMap<String, usize>,
    package_index: HashMap<String, usize>,
}

impl BuildGraph {
    /// Build a graph from projects and packages, keeping declaration order
    ///
    /// Names must be unique within their kind; later duplicates are ignored.
    pub fn new(projects: Vec<Project>, packages: Vec<Package>) -> Self {
        let mut graph = Self::default();
        for project in projects {
            if graph.project_index.contains_key(&project.name) {
                tracing::warn!("Ignoring duplicate project '{}'", project.name);
                continue;
            }
            graph
                .project_index
                .insert(project.name.clone(), graph.projects.len());
            graph.projects.push(project);
        }
        for package in packages {
            if graph.package_index.contains_key(&package.name) {
                tracing::warn!("Ignoring duplicate package '{}'", package.name);
                continue;
            }
            graph
                .package_index
                .insert(package.name.clone(), graph.packages.len());
            graph.packages.push(package);
        }
        graph
    }

    /// Projects, in declaration order
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Packages, in declaration order
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Look up a project by name, ignoring packages
    pub fn project(&self, name: &str) -> Option<&Project> {
        self.project_index.get(name).map(|&i| &self.projects[i])
    }

    /// Look up a package by name, ignoring projects
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.package_index.get(name).map(|&i| &self.packages[i])
    }

    /// Whether `name` is a project or a package
    pub fn contains(&self, name: &str) -> bool {
        self.project_index.contains_key(name) || self.package_index.contains_key(name)
    }

    /// Resolve a name to a node, applying the precedence rule when both a
    /// project and a package carry it
    pub fn get_node(&self, name: &str, precedence: &Precedence) -> Option<Node<'_>> {
        match (self.project(name), self.package(name)) {
            (Some(project), Some(_)) if precedence.project_wins(name) => {
                Some(Node::Project(project))
            }
            (_, Some(package)) => Some(Node::Package(package)),
            (Some(project), None) => Some(Node::Project(project)),
            (None, None) => None,
        }
    }

    /// Raw declared dependency names of `node` for one kind
    pub fn declared_deps<'g>(&self, node: Node<'g>, kind: DependencyKind) -> &'g BTreeSet<String> {
        node.declared_deps(kind)
    }

    /// Every known name: projects first, then packages not shadowed by a
    /// project name, each in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(|p| p.name.as_str()).chain(
            self.packages
                .iter()
                .filter(move |p| !self.project_index.contains_key(&p.name))
                .map(|p| p.name.as_str()),
        )
    }

    /// Adjacency map restricted to `kinds`
    ///
    /// Each name maps to the union of the requested kinds of the node that
    /// `precedence` selects for it.
    pub fn adjacency(
        &self,
        kinds: &[DependencyKind],
        precedence: &Precedence,
    ) -> HashMap<String, BTreeSet<String>> {
        self.names()
            .filter_map(|name| self.get_node(name, precedence))
            .map(|node| (node.name().to_string(), node.dependencies().union_of(kinds)))
            .collect()
    }
}
