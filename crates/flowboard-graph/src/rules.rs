//! Connection compatibility rules.
//!
//! A fixed table maps each source [`NodeKind`] to the set of target kinds that
//! may receive an edge from it. The table constrains by kind only: handle
//! identity, edge cardinality, and cycle formation are deliberately
//! unconstrained.

use std::collections::{HashMap, HashSet};

use flowboard_types::{FlowboardError, NodeKind, Result};

/// Allowed targets for one source kind.
#[derive(Debug, Clone)]
pub enum Targets {
    /// Any target kind is accepted.
    Any,
    /// Only the listed kinds are accepted; an empty set permits nothing.
    Only(HashSet<NodeKind>),
}

/// The compatibility table consulted before an edge mutation commits.
///
/// A kind absent from the table permits no outgoing connections.
#[derive(Debug, Clone)]
pub struct ConnectionRules {
    allowed: HashMap<NodeKind, Targets>,
}

impl ConnectionRules {
    /// Build a table from a custom mapping.
    pub fn from_table(allowed: HashMap<NodeKind, Targets>) -> Self {
        Self { allowed }
    }

    /// Check a proposed connection, rejecting with a reason naming both kinds.
    pub fn check(&self, source: NodeKind, target: NodeKind) -> Result<()> {
        let permitted = match self.allowed.get(&source) {
            Some(Targets::Any) => true,
            Some(Targets::Only(kinds)) => kinds.contains(&target),
            None => false,
        };
        if permitted {
            Ok(())
        } else {
            Err(FlowboardError::ConnectionRejected { source, target })
        }
    }
}

impl Default for ConnectionRules {
    fn default() -> Self {
        use NodeKind::*;

        fn only(kinds: &[NodeKind]) -> Targets {
            Targets::Only(kinds.iter().copied().collect())
        }

        let mut allowed = HashMap::new();
        allowed.insert(Input, only(&[Llm, Text, Api, Database, Slack, Note]));
        allowed.insert(Llm, only(&[Output, Text, Api, Database, Slack, Note]));
        allowed.insert(Text, only(&[Llm, Output, Api, Database, Slack, Note]));
        allowed.insert(Timer, only(&[Llm, Api, Database, Slack, Text]));
        allowed.insert(Api, only(&[Llm, Output, Text, Database, Slack]));
        allowed.insert(Database, only(&[Llm, Output, Text]));
        allowed.insert(Slack, only(&[]));
        allowed.insert(Note, Targets::Any);
        // Output is absent on purpose: sinks have no outgoing connections.
        Self { allowed }
    }
}
