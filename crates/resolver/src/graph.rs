//! Component dependency graph
//!
//! Edges point from a component to what it needs, so a topological order
//! lists dependencies before their dependents.

use ifw_errors::{DependencyError, Error};
use std::collections::{BTreeMap, BTreeSet};

/// Dependency graph over component names
///
/// Ordered maps keep every traversal, and so every plan, deterministic.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: &str) {
        self.edges.entry(name.to_string()).or_default();
    }

    /// Record that `from` needs `to`; both become nodes
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.add_node(to);
        self.edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Direct dependencies of `name`
    pub fn dependencies(&self, name: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Nodes that depend directly on `name`
    pub fn dependents<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |(_, deps)| deps.contains(name))
            .map(|(node, _)| node.as_str())
    }

    /// First back edge found by a depth-first search, as `(from, to)`
    #[must_use]
    pub fn find_cycle(&self) -> Option<(String, String)> {
        let mut colors: BTreeMap<&str, Color> =
            self.edges.keys().map(|k| (k.as_str(), Color::White)).collect();

        for start in self.edges.keys() {
            if colors.get(start.as_str()) != Some(&Color::White) {
                continue;
            }
            // Explicit stack of (node, remaining children) keeps deep graphs
            // off the call stack
            let mut stack = vec![(start.as_str(), self.dependencies(start).collect::<Vec<_>>())];
            colors.insert(start.as_str(), Color::Grey);
            while let Some((node, children)) = stack.last_mut() {
                let node = *node;
                match children.pop() {
                    Some(child) => match colors.get(child).copied() {
                        Some(Color::Grey) => return Some((node.to_string(), child.to_string())),
                        Some(Color::White) => {
                            colors.insert(child, Color::Grey);
                            let mut grandchildren: Vec<_> = self.dependencies(child).collect();
                            grandchildren.reverse();
                            stack.push((child, grandchildren));
                        }
                        _ => {}
                    },
                    None => {
                        colors.insert(node, Color::Black);
                        stack.pop();
                    }
                }
            }
        }
        None
    }

    /// Kahn's algorithm, dependencies first, ties broken by name
    ///
    /// # Errors
    ///
    /// `DependencyError::Cycle` naming the pair on a back edge.
    pub fn topological_sort(&self) -> Result<Vec<String>, Error> {
        if let Some((a, b)) = self.find_cycle() {
            return Err(DependencyError::Cycle { a, b }.into());
        }

        let mut remaining: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(node, deps)| (node.as_str(), deps.len()))
            .collect();
        let mut ready: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| *node)
            .collect();

        let mut order = Vec::with_capacity(self.edges.len());
        while let Some(node) = ready.pop_first() {
            order.push(node.to_string());
            for dependent in self.dependents(node) {
                if let Some(degree) = remaining.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != self.edges.len() {
            return Err(Error::internal("topological sort left nodes behind"));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_detection_names_pair() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "b");
        assert!(graph.find_cycle().is_none());

        graph.add_edge("b", "a");
        let (x, y) = graph.find_cycle().unwrap();
        let mut pair = [x, y];
        pair.sort();
        assert_eq!(pair, ["a".to_string(), "b".to_string()]);

        let err = graph.topological_sort().unwrap_err();
        assert!(err.to_string().contains("Dependency cycle between components detected"));
    }

    #[test]
    fn test_self_loop() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("a", "a");
        assert_eq!(graph.find_cycle(), Some(("a".to_string(), "a".to_string())));
    }

    #[test]
    fn test_topological_sort() {
        let mut graph = DependencyGraph::new();
        // a depends on b, b depends on c
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        graph.add_node("d");

        let sorted = graph.topological_sort().unwrap();
        assert_eq!(sorted, vec!["c", "b", "a", "d"].into_iter().map(String::from).collect::<Vec<_>>());
        assert_eq!(graph.dependents("c").collect::<Vec<_>>(), vec!["b"]);
    }
}
