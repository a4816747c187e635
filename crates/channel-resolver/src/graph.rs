//! The requirement graph: an explicit DAG over manifest requirements,
//! built in two phases (nodes, then edges) so that cycles are caught by
//! coloring rather than by a mutable "visited" flag on live instances.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A DAG of manifest keys (sibling channel ids or `group:artifact` Maven
/// references), used solely to detect cyclic `requires` chains before a
/// session commits to building channel instances.
#[derive(Default)]
pub struct RequirementGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl RequirementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for `key`.
    pub fn node(&mut self, key: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.graph.add_node(key.to_string());
        self.index.insert(key.to_string(), idx);
        idx
    }

    /// Record that `from` requires `to`.
    pub fn add_requirement(&mut self, from: &str, to: &str) {
        let from = self.node(from);
        let to = self.node(to);
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Find a cycle reachable from any node, if one exists, returning the
    /// cycle as a path of keys (first and last entries equal).
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colors = vec![Color::White; self.graph.node_count()];
        let mut path = Vec::new();

        for start in self.graph.node_indices() {
            if colors[start.index()] == Color::White {
                if let Some(cycle) = self.dfs(start, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs(
        &self,
        node: NodeIndex,
        colors: &mut [Color],
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<String>> {
        colors[node.index()] = Color::Gray;
        path.push(node);

        for edge in self.graph.edges(node) {
            let target = edge.target();
            match colors[target.index()] {
                Color::White => {
                    if let Some(cycle) = self.dfs(target, colors, path) {
                        return Some(cycle);
                    }
                }
                Color::Gray => {
                    let start_pos = path.iter().position(|&n| n == target).expect("gray node must be on path");
                    let mut cycle: Vec<String> =
                        path[start_pos..].iter().map(|&n| self.graph[n].clone()).collect();
                    cycle.push(self.graph[target].clone());
                    return Some(cycle);
                }
                Color::Black => {}
            }
        }

        path.pop();
        colors[node.index()] = Color::Black;
        None
    }
}
