//! The canvas store: canonical node and edge collections with atomic
//! mutation primitives.
//!
//! Every history-tracked mutation pushes the pre-mutation snapshot before
//! applying itself; field updates and presentation deltas bypass the history
//! on purpose so a drag or a keystroke never costs an undo step.

use flowboard_types::{
    Edge, EdgeChange, EdgeStyle, FlowboardError, Node, NodeChange, NodeKind, Position, Result,
};

use crate::allocator::IdAllocator;
use crate::history::{History, Snapshot};
use crate::rules::ConnectionRules;

/// A proposed connection between two node handles.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionProposal {
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
}

impl ConnectionProposal {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_handle: String::new(),
            target_handle: String::new(),
        }
    }

    pub fn with_handles(
        mut self,
        source_handle: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        self.source_handle = source_handle.into();
        self.target_handle = target_handle.into();
        self
    }
}

/// Owns the canonical `{nodes, edges}` state, the id allocator, the undo
/// history, and the connection rules.
#[derive(Debug)]
pub struct CanvasStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    ids: IdAllocator,
    history: History,
    rules: ConnectionRules,
}

impl CanvasStore {
    pub fn new() -> Self {
        Self::with_rules(ConnectionRules::default())
    }

    pub fn with_rules(rules: ConnectionRules) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            ids: IdAllocator::new(),
            history: History::new(),
            rules,
        }
    }

    // --- Reads ---

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn history_depth(&self) -> usize {
        self.history.past_depth()
    }

    pub fn future_depth(&self) -> usize {
        self.history.future_depth()
    }

    /// Issue a fresh id for `kind` without inserting anything.
    pub fn next_id(&mut self, kind: NodeKind) -> String {
        self.ids.next_id(kind)
    }

    // --- History-tracked mutations ---

    /// Append a node whose id was obtained from the allocator.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.node(&node.id).is_some() {
            return Err(FlowboardError::DuplicateNode(node.id));
        }
        self.checkpoint();
        tracing::debug!(node = %node.id, kind = %node.kind, "Node added");
        self.nodes.push(node);
        Ok(())
    }

    /// Allocate an id and insert a node with empty data at `position`.
    /// Returns the new node's id.
    pub fn spawn_node(&mut self, kind: NodeKind, position: Position) -> String {
        let id = self.ids.next_id(kind);
        self.checkpoint();
        tracing::debug!(node = %id, kind = %kind, "Node added");
        self.nodes.push(Node::new(id.clone(), kind, position));
        id
    }

    /// Remove a node and cascade-delete every edge touching it.
    ///
    /// Returns the number of edges removed by the cascade. An unknown id
    /// matches nothing.
    pub fn remove_node(&mut self, id: &str) -> usize {
        self.checkpoint();
        let edges_before = self.edges.len();
        self.nodes.retain(|n| n.id != id);
        self.edges.retain(|e| e.source != id && e.target != id);
        let cascaded = edges_before - self.edges.len();
        tracing::debug!(node = %id, cascaded, "Node removed");
        cascaded
    }

    /// Remove one edge by id. An unknown id matches nothing.
    pub fn delete_edge(&mut self, id: &str) {
        self.checkpoint();
        self.edges.retain(|e| e.id != id);
        tracing::debug!(edge = %id, "Edge deleted");
    }

    /// Validate and commit a proposed connection.
    ///
    /// Both endpoints must exist and the rules table must permit the pair.
    /// On success the new edge carries a generated id and the default visual
    /// style; on rejection nothing is mutated and no checkpoint is taken.
    pub fn connect(&mut self, proposal: ConnectionProposal) -> Result<String> {
        let source = self
            .node(&proposal.source)
            .ok_or_else(|| FlowboardError::UnknownNode(proposal.source.clone()))?;
        let target = self
            .node(&proposal.target)
            .ok_or_else(|| FlowboardError::UnknownNode(proposal.target.clone()))?;

        if let Err(rejection) = self.rules.check(source.kind, target.kind) {
            tracing::warn!(
                source = %proposal.source,
                target = %proposal.target,
                "Connection rejected"
            );
            return Err(rejection);
        }

        self.checkpoint();
        let id = uuid::Uuid::new_v4().to_string();
        self.edges.push(Edge {
            id: id.clone(),
            source: proposal.source,
            target: proposal.target,
            source_handle: proposal.source_handle,
            target_handle: proposal.target_handle,
            style: EdgeStyle::default(),
            selected: false,
        });
        tracing::debug!(edge = %id, "Edge connected");
        Ok(id)
    }

    // --- Untracked mutations ---

    /// Merge `{field: value}` into a node's data mapping in place.
    ///
    /// Field edits are not undo-checkpointed so typing into a widget never
    /// produces one history entry per keystroke. An unknown id is a no-op.
    pub fn update_node_field(
        &mut self,
        id: &str,
        field: impl Into<String>,
        value: serde_json::Value,
    ) {
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.data.insert(field.into(), value);
        }
    }

    /// Apply bulk positional/selection deltas from the presentation layer.
    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        for change in changes {
            match change {
                NodeChange::Moved { id, position } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.position = position;
                    }
                }
                NodeChange::Selected { id, selected } => {
                    if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                        node.selected = selected;
                    }
                }
                NodeChange::Removed { id } => {
                    self.nodes.retain(|n| n.id != id);
                }
            }
        }
    }

    /// Apply bulk selection/removal deltas to edges.
    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Selected { id, selected } => {
                    if let Some(edge) = self.edges.iter_mut().find(|e| e.id == id) {
                        edge.selected = selected;
                    }
                }
                EdgeChange::Removed { id } => {
                    self.edges.retain(|e| e.id != id);
                }
            }
        }
    }

    // --- Wholesale transitions ---

    /// Empty nodes, edges, and both history stacks.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.history.clear();
        tracing::debug!("Canvas cleared");
    }

    /// Replace both collections wholesale (template application, load).
    /// Clears both history stacks.
    pub fn set_pipeline(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
        self.history.clear();
    }

    // --- Undo / redo ---

    /// Restore the most recent past snapshot. Returns whether anything
    /// changed.
    pub fn undo(&mut self) -> bool {
        let current = Snapshot::capture(&self.nodes, &self.edges);
        match self.history.undo(current) {
            Some(snapshot) => {
                self.nodes = snapshot.nodes;
                self.edges = snapshot.edges;
                true
            }
            None => false,
        }
    }

    /// Restore the most recent undone snapshot. Returns whether anything
    /// changed.
    pub fn redo(&mut self) -> bool {
        let current = Snapshot::capture(&self.nodes, &self.edges);
        match self.history.redo(current) {
            Some(snapshot) => {
                self.nodes = snapshot.nodes;
                self.edges = snapshot.edges;
                true
            }
            None => false,
        }
    }

    fn checkpoint(&mut self) {
        self.history.checkpoint(&self.nodes, &self.edges);
    }
}

impl Default for CanvasStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowboard_types::NodeKind;

    fn store_with_pair() -> (CanvasStore, String, String) {
        let mut store = CanvasStore::new();
        let input = store.spawn_node(NodeKind::Input, Position::new(0.0, 0.0));
        let llm = store.spawn_node(NodeKind::Llm, Position::new(200.0, 0.0));
        (store, input, llm)
    }

    #[test]
    fn spawn_node_allocates_sequential_ids() {
        let mut store = CanvasStore::new();
        let a = store.spawn_node(NodeKind::Llm, Position::default());
        let b = store.spawn_node(NodeKind::Llm, Position::default());
        assert_eq!(a, "llm-1");
        assert_eq!(b, "llm-2");
    }

    #[test]
    fn add_node_rejects_duplicate_ids() {
        let mut store = CanvasStore::new();
        store
            .add_node(Node::new("llm-1", NodeKind::Llm, Position::default()))
            .unwrap();
        let before_history = store.history_depth();
        let err = store
            .add_node(Node::new("llm-1", NodeKind::Llm, Position::default()))
            .unwrap_err();
        assert!(matches!(err, FlowboardError::DuplicateNode(_)));
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.history_depth(), before_history, "rejection takes no checkpoint");
    }

    #[test]
    fn allowed_connect_adds_one_edge_and_one_checkpoint() {
        let (mut store, input, llm) = store_with_pair();
        let history_before = store.history_depth();

        let edge_id = store.connect(ConnectionProposal::new(&input, &llm)).unwrap();

        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.history_depth(), history_before + 1);
        let edge = store.edge(&edge_id).unwrap();
        assert_eq!(edge.source, input);
        assert_eq!(edge.target, llm);
        assert!(edge.style.animated);
        assert_eq!(edge.style.stroke_width, 2);
    }

    #[test]
    fn disallowed_connect_mutates_nothing() {
        let mut store = CanvasStore::new();
        let slack = store.spawn_node(NodeKind::Slack, Position::default());
        let llm = store.spawn_node(NodeKind::Llm, Position::default());
        let history_before = store.history_depth();

        let err = store.connect(ConnectionProposal::new(&slack, &llm)).unwrap_err();

        assert!(matches!(err, FlowboardError::ConnectionRejected { .. }));
        assert!(store.edges().is_empty());
        assert_eq!(store.history_depth(), history_before);
    }

    #[test]
    fn connect_with_missing_endpoint_is_rejected() {
        let (mut store, input, _) = store_with_pair();
        let err = store
            .connect(ConnectionProposal::new(&input, "ghost-1"))
            .unwrap_err();
        assert!(matches!(err, FlowboardError::UnknownNode(_)));
        assert!(store.edges().is_empty());
    }

    #[test]
    fn parallel_edges_between_the_same_pair_are_permitted() {
        let (mut store, input, llm) = store_with_pair();
        let first = store.connect(ConnectionProposal::new(&input, &llm)).unwrap();
        let second = store.connect(ConnectionProposal::new(&input, &llm)).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn cycle_forming_edges_are_permitted() {
        let mut store = CanvasStore::new();
        let text = store.spawn_node(NodeKind::Text, Position::default());
        let llm = store.spawn_node(NodeKind::Llm, Position::default());
        store.connect(ConnectionProposal::new(&text, &llm)).unwrap();
        store.connect(ConnectionProposal::new(&llm, &text)).unwrap();
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn remove_node_cascades_touching_edges() {
        let mut store = CanvasStore::new();
        let input = store.spawn_node(NodeKind::Input, Position::default());
        let llm = store.spawn_node(NodeKind::Llm, Position::default());
        let output = store.spawn_node(NodeKind::Output, Position::default());
        store.connect(ConnectionProposal::new(&input, &llm)).unwrap();
        store.connect(ConnectionProposal::new(&llm, &output)).unwrap();

        let cascaded = store.remove_node(&llm);

        assert_eq!(cascaded, 2);
        assert_eq!(store.nodes().len(), 2);
        assert!(
            store
                .edges()
                .iter()
                .all(|e| e.source != llm && e.target != llm),
            "no edge may reference the removed node"
        );
    }

    #[test]
    fn remove_unknown_id_changes_no_records() {
        let (mut store, _, _) = store_with_pair();
        let nodes_before = store.nodes().len();
        store.remove_node("ghost-9");
        store.delete_edge("ghost-edge");
        assert_eq!(store.nodes().len(), nodes_before);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn update_node_field_merges_without_checkpointing() {
        let (mut store, input, _) = store_with_pair();
        let history_before = store.history_depth();

        for i in 0..10 {
            store.update_node_field(&input, "inputName", serde_json::json!(format!("name{i}")));
        }

        assert_eq!(store.history_depth(), history_before);
        assert_eq!(
            store.node(&input).unwrap().data.get("inputName"),
            Some(&serde_json::json!("name9"))
        );
    }

    #[test]
    fn node_changes_apply_without_checkpointing() {
        let (mut store, input, llm) = store_with_pair();
        let history_before = store.history_depth();

        store.apply_node_changes(vec![
            NodeChange::Moved {
                id: input.clone(),
                position: Position::new(40.0, 80.0),
            },
            NodeChange::Selected {
                id: llm.clone(),
                selected: true,
            },
        ]);

        assert_eq!(store.history_depth(), history_before);
        assert_eq!(store.node(&input).unwrap().position, Position::new(40.0, 80.0));
        assert!(store.node(&llm).unwrap().selected);
    }

    #[test]
    fn edge_changes_apply_without_checkpointing() {
        let (mut store, input, llm) = store_with_pair();
        let edge_id = store.connect(ConnectionProposal::new(&input, &llm)).unwrap();
        let history_before = store.history_depth();

        store.apply_edge_changes(vec![EdgeChange::Removed { id: edge_id }]);

        assert!(store.edges().is_empty());
        assert_eq!(store.history_depth(), history_before);
    }

    #[test]
    fn undo_redo_round_trip_over_a_mutation_sequence() {
        let mut store = CanvasStore::new();
        let input = store.spawn_node(NodeKind::Input, Position::default());
        let llm = store.spawn_node(NodeKind::Llm, Position::default());
        store.connect(ConnectionProposal::new(&input, &llm)).unwrap();
        store.remove_node(&input);

        let final_nodes = store.nodes().to_vec();
        let final_edges = store.edges().to_vec();

        // Four tracked mutations; four undos return to the empty canvas.
        for _ in 0..4 {
            assert!(store.undo());
        }
        assert!(store.nodes().is_empty());
        assert!(store.edges().is_empty());
        assert!(!store.undo(), "history exhausted");

        for _ in 0..4 {
            assert!(store.redo());
        }
        assert_eq!(store.nodes(), final_nodes.as_slice());
        assert_eq!(store.edges(), final_edges.as_slice());
        assert!(!store.redo(), "future exhausted");
    }

    #[test]
    fn tracked_mutation_after_undo_discards_redo_states() {
        let mut store = CanvasStore::new();
        store.spawn_node(NodeKind::Text, Position::default());
        store.undo();
        assert_eq!(store.future_depth(), 1);

        store.spawn_node(NodeKind::Note, Position::default());
        assert_eq!(store.future_depth(), 0);
        assert!(!store.redo());
    }

    #[test]
    fn clear_empties_graph_and_both_stacks() {
        let (mut store, _, _) = store_with_pair();
        store.undo();
        store.clear();
        assert!(store.nodes().is_empty());
        assert_eq!(store.history_depth(), 0);
        assert_eq!(store.future_depth(), 0);
        assert!(!store.undo());
        assert!(!store.redo());
    }

    #[test]
    fn set_pipeline_replaces_wholesale_and_clears_history() {
        let (mut store, _, _) = store_with_pair();
        let nodes = vec![Node::new("note-1", NodeKind::Note, Position::default())];
        store.set_pipeline(nodes, Vec::new());
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.nodes()[0].id, "note-1");
        assert_eq!(store.history_depth(), 0);
    }

    #[test]
    fn allocator_never_reissues_after_deletion() {
        let mut store = CanvasStore::new();
        let first = store.spawn_node(NodeKind::Api, Position::default());
        store.remove_node(&first);
        let second = store.spawn_node(NodeKind::Api, Position::default());
        assert_eq!(first, "api-1");
        assert_eq!(second, "api-2");
    }
}
