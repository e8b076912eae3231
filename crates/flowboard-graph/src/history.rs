//! Snapshot-based undo/redo stacks.

use serde::{Deserialize, Serialize};

use flowboard_types::{Edge, Node};

/// Maximum number of past snapshots retained before the oldest is evicted.
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// A deep copy of the full graph state, used to support undo/redo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn capture(nodes: &[Node], edges: &[Edge]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            edges: edges.to_vec(),
        }
    }
}

/// Two LIFO stacks of snapshots: `past` states reachable by undo, `future`
/// states reachable by redo.
///
/// Every history-tracked mutation pushes the pre-mutation snapshot onto
/// `past` and clears `future`. The past stack is capped; eviction drops the
/// oldest entry.
#[derive(Debug)]
pub struct History {
    past: Vec<Snapshot>,
    future: Vec<Snapshot>,
    cap: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_HISTORY_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            cap,
        }
    }

    /// Record the pre-mutation state. Any redo states are discarded.
    pub fn checkpoint(&mut self, nodes: &[Node], edges: &[Edge]) {
        if self.past.len() == self.cap {
            self.past.remove(0);
        }
        self.past.push(Snapshot::capture(nodes, edges));
        self.future.clear();
    }

    /// Pop the most recent past snapshot, storing `current` for redo.
    /// Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.past.pop()?;
        self.future.push(current);
        Some(previous)
    }

    /// Pop the most recent future snapshot, storing `current` for undo.
    /// Returns `None` when there is nothing to redo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn past_depth(&self) -> usize {
        self.past.len()
    }

    pub fn future_depth(&self) -> usize {
        self.future.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
