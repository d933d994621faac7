//! Stable topological sort
//!
//! Depth-first, post-order expansion from an ordered list of seeds. Dependency
//! sets are `BTreeSet`s, so children are always visited in lexicographic
//! order and the same input always yields the same output.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::ResolverError;

/// Adjacency map: node name -> names it depends on
///
/// Names that appear only as dependencies are leaves.
pub type Adjacency = HashMap<String, BTreeSet<String>>;

/// Sort the closure of `seeds` so that every dependency comes before its
/// dependents
///
/// Seeds are expanded in the given order; a node is emitted once, after all of
/// its dependencies. Runs in O(V + E).
///
/// Expansion recurses once per edge on the current path, so stack usage grows
/// with the longest dependency chain. Chains of a few thousand nodes fit in
/// the default thread stack; worktrees are far smaller.
///
/// # Errors
///
/// Returns [`ResolverError::CycleDetected`] when a node is reached again while
/// it is still being expanded. The chain starts and ends with that node.
pub fn topological_sort<S: AsRef<str>>(
    adjacency: &Adjacency,
    seeds: &[S],
) -> Result<Vec<String>, ResolverError> {
    let mut sorter = Sorter {
        adjacency,
        visited: HashSet::new(),
        on_stack: HashSet::new(),
        path: Vec::new(),
        result: Vec::new(),
    };

    for seed in seeds {
        sorter.visit(seed.as_ref())?;
    }

    Ok(sorter.result)
}

struct Sorter<'a> {
    adjacency: &'a Adjacency,
    visited: HashSet<String>,
    on_stack: HashSet<String>,
    path: Vec<String>,
    result: Vec<String>,
}

impl Sorter<'_> {
    fn visit(&mut self, node: &str) -> Result<(), ResolverError> {
        if self.visited.contains(node) {
            return Ok(());
        }

        if self.on_stack.contains(node) {
            let start = self.path.iter().position(|n| n == node).unwrap_or(0);
            let mut chain = self.path[start..].to_vec();
            chain.push(node.to_string());
            return Err(ResolverError::CycleDetected { chain });
        }

        self.on_stack.insert(node.to_string());
        self.path.push(node.to_string());

        let adjacency = self.adjacency;
        if let Some(deps) = adjacency.get(node) {
            for dep in deps {
                self.visit(dep)?;
            }
        }

        self.path.pop();
        self.on_stack.remove(node);
        self.visited.insert(node.to_string());
        self.result.push(node.to_string());

        Ok(())
    }
}
