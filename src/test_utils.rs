//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use crate::core::graph::{BuildGraph, DependencyKind, Package, Project};
    use crate::core::sort::Adjacency;

    /// Name of the i-th generated node
    pub fn node_name(i: usize) -> String {
        format!("n{i:02}")
    }

    /// Lower-triangular edge matrix: node `i` may only depend on `j < i`
    fn edge_matrix() -> impl Strategy<Value = (usize, Vec<Vec<bool>>)> {
        (2usize..12).prop_flat_map(|n| {
            (
                Just(n),
                proptest::collection::vec(proptest::collection::vec(any::<bool>(), n), n),
            )
        })
    }

    fn to_adjacency(n: usize, matrix: &[Vec<bool>]) -> Adjacency {
        (0..n)
            .map(|i| {
                let deps: BTreeSet<String> =
                    (0..i).filter(|&j| matrix[i][j]).map(node_name).collect();
                (node_name(i), deps)
            })
            .collect()
    }

    /// Generate an acyclic adjacency map together with 1-3 seeds
    pub fn acyclic_adjacency() -> impl Strategy<Value = (Adjacency, Vec<String>)> {
        edge_matrix().prop_flat_map(|(n, matrix)| {
            let seeds = proptest::collection::vec(0..n, 1..4);
            (Just(to_adjacency(n, &matrix)), seeds).prop_map(|(adjacency, seeds)| {
                (adjacency, seeds.into_iter().map(node_name).collect())
            })
        })
    }

    /// Generate an adjacency map where every node lies on one cycle
    pub fn cyclic_adjacency() -> impl Strategy<Value = (Adjacency, Vec<String>)> {
        acyclic_adjacency().prop_map(|(mut adjacency, seeds)| {
            let n = adjacency.len();
            for i in 1..n {
                if let Some(deps) = adjacency.get_mut(&node_name(i)) {
                    deps.insert(node_name(i - 1));
                }
            }
            if let Some(deps) = adjacency.get_mut(&node_name(0)) {
                deps.insert(node_name(n - 1));
            }
            (adjacency, seeds)
        })
    }

    /// How a generated node is provided
    #[derive(Debug, Clone, Copy)]
    pub enum Provider {
        Project,
        Package,
        Both,
    }

    fn provider() -> impl Strategy<Value = Provider> {
        prop_oneof![
            3 => Just(Provider::Project),
            1 => Just(Provider::Package),
            1 => Just(Provider::Both),
        ]
    }

    /// Edge label: build only, runtime only, or both
    fn edge_kinds() -> impl Strategy<Value = Option<Vec<DependencyKind>>> {
        prop_oneof![
            2 => Just(None),
            1 => Just(Some(vec![DependencyKind::Build])),
            1 => Just(Some(vec![DependencyKind::Runtime])),
            1 => Just(Some(vec![DependencyKind::Build, DependencyKind::Runtime])),
        ]
    }

    /// Generate an acyclic graph of projects and packages with build and
    /// runtime edges, plus names that are declared but never provided
    ///
    /// A project and a package sharing a name draw their edges independently,
    /// so which one wins changes the graph. Edges only point to lower
    /// indices, so every choice stays acyclic.
    pub fn build_graph() -> impl Strategy<Value = BuildGraph> {
        (2usize..10)
            .prop_flat_map(|n| {
                (
                    proptest::collection::vec(provider(), n),
                    proptest::collection::vec(proptest::collection::vec(edge_kinds(), n), n),
                    proptest::collection::vec(proptest::collection::vec(edge_kinds(), n), n),
                    proptest::collection::vec(any::<bool>(), n),
                )
            })
            .prop_map(|(providers, edges, package_edges, dangling)| {
                let n = providers.len();
                let mut projects = Vec::new();
                let mut packages = Vec::new();
                for i in 0..n {
                    let name = node_name(i);
                    let mut project = Project::new(name.clone(), format!("/src/{name}"));
                    let mut package = Package::new(name.clone(), format!("/toolchain/{name}"));
                    for (j, kinds) in edges[i].iter().enumerate().take(i) {
                        for kind in kinds.iter().flatten() {
                            project = project.with_depends(*kind, [node_name(j)]);
                        }
                    }
                    for (j, kinds) in package_edges[i].iter().enumerate().take(i) {
                        for kind in kinds.iter().flatten() {
                            package = package.with_depends(*kind, [node_name(j)]);
                        }
                    }
                    if dangling[i] {
                        project =
                            project.with_depends(DependencyKind::Runtime, [format!("missing{i}")]);
                    }
                    match providers[i] {
                        Provider::Project => projects.push(project),
                        Provider::Package => packages.push(package),
                        Provider::Both => {
                            projects.push(project);
                            packages.push(package);
                        }
                    }
                }
                BuildGraph::new(projects, packages)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::core::graph::DependencyKind;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_acyclic_edges_point_backwards((graph, seeds) in acyclic_adjacency()) {
            prop_assert!(!seeds.is_empty());
            for (name, deps) in &graph {
                for dep in deps {
                    prop_assert!(dep < name);
                }
            }
        }

        #[test]
        fn test_build_graph_is_not_empty(graph in build_graph()) {
            prop_assert!(graph.names().count() >= 2);
        }

        #[test]
        fn test_build_graph_edges_point_backwards(graph in build_graph()) {
            let deps = graph
                .projects()
                .iter()
                .map(|p| (&p.name, &p.depends))
                .chain(graph.packages().iter().map(|p| (&p.name, &p.depends)));
            for (name, depends) in deps {
                for dep in depends.union_of(&DependencyKind::ALL) {
                    prop_assert!(dep.starts_with("missing") || dep < *name);
                }
            }
        }
    }
}
