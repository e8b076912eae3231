//! Per-kind node identifier allocation.

use std::collections::HashMap;

use flowboard_types::NodeKind;

/// Hands out unique, stable node ids of the form `"{kind}-{n}"`.
///
/// Counters are monotonic per kind for the life of the session and are never
/// rewound, so an id is never reissued even after the node it named is
/// deleted.
#[derive(Debug, Default)]
pub struct IdAllocator {
    counters: HashMap<NodeKind, u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id for `kind`.
    pub fn next_id(&mut self, kind: NodeKind) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}-{}", kind.as_str(), counter)
    }

    /// The last sequence number issued for `kind`, if any.
    pub fn last_issued(&self, kind: NodeKind) -> Option<u64> {
        self.counters.get(&kind).copied()
    }
}
