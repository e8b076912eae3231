//! Pipeline summary report: node/edge counts and a DAG verdict.
//!
//! Computed locally over the store's snapshot so collaborators can show
//! submission feedback without shipping the graph anywhere.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use flowboard_types::{Edge, Node};

/// Basic stats plus whether the graph is a directed acyclic graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub is_dag: bool,
}

/// Analyze a graph snapshot.
///
/// Edges whose source is not a known node are ignored for cycle detection.
pub fn analyze(nodes: &[Node], edges: &[Edge]) -> PipelineReport {
    PipelineReport {
        num_nodes: nodes.len(),
        num_edges: edges.len(),
        is_dag: is_dag(nodes, edges),
    }
}

/// Cycle detection via depth-first search with an explicit recursion stack:
/// a back edge into the stack means the graph is not a DAG.
fn is_dag(nodes: &[Node], edges: &[Edge]) -> bool {
    let mut adjacency: HashMap<&str, Vec<&str>> = nodes
        .iter()
        .map(|n| (n.id.as_str(), Vec::new()))
        .collect();
    for edge in edges {
        if let Some(targets) = adjacency.get_mut(edge.source.as_str()) {
            targets.push(edge.target.as_str());
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    for node in nodes {
        if visited.contains(node.id.as_str()) {
            continue;
        }
        // Iterative DFS; each frame tracks how far into its neighbor list it
        // has advanced.
        let mut stack: Vec<(&str, usize)> = vec![(node.id.as_str(), 0)];
        visited.insert(node.id.as_str());
        on_stack.insert(node.id.as_str());

        while let Some(frame) = stack.last_mut() {
            let (current, cursor) = *frame;
            let neighbors = adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]);
            match neighbors.get(cursor) {
                Some(&next) => {
                    frame.1 += 1;
                    if on_stack.contains(next) {
                        return false;
                    }
                    if visited.insert(next) {
                        on_stack.insert(next);
                        stack.push((next, 0));
                    }
                }
                None => {
                    on_stack.remove(current);
                    stack.pop();
                }
            }
        }
    }

    true
}
