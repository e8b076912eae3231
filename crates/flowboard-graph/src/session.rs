//! The editor session: one explicit context object owning the store, the
//! overlay, the persistence gateway, and the event emitter.
//!
//! Nothing here is ambient or static, so independent sessions (and their
//! tests) coexist freely. Mutation intents from the presentation layer pass
//! through the session, which forwards them to the store and emits the
//! matching [`CanvasEvent`]s.

use std::future::Future;
use std::sync::Arc;

use flowboard_types::{
    Edge, EdgeChange, FlowboardError, Node, NodeChange, NodeKind, Position, Result, SaveStatus,
};

use crate::events::{CanvasEvent, EventEmitter};
use crate::persistence::{KeyValueStore, PersistenceGateway, SaveTimings};
use crate::report::{analyze, PipelineReport};
use crate::simulation::{Clock, Overlay, SimulationEngine, SimulationTimings};
use crate::store::{CanvasStore, ConnectionProposal};

/// Session-wide context for one pipeline canvas.
pub struct EditorSession {
    store: CanvasStore,
    overlay: Overlay,
    gateway: PersistenceGateway,
    engine: SimulationEngine,
    emitter: EventEmitter,
}

impl EditorSession {
    /// A session over the given storage backend and clock, with the default
    /// timings.
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_timings(
            storage,
            clock,
            SimulationTimings::default(),
            SaveTimings::default(),
        )
    }

    pub fn with_timings(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        simulation: SimulationTimings,
        save: SaveTimings,
    ) -> Self {
        let emitter = EventEmitter::default();
        let overlay = Overlay::new();
        let gateway =
            PersistenceGateway::new(storage, Arc::clone(&clock), save, emitter.clone());
        let engine = SimulationEngine::new(overlay.clone(), clock, simulation, emitter.clone());
        Self {
            store: CanvasStore::new(),
            overlay,
            gateway,
            engine,
            emitter,
        }
    }

    // --- Reads for the presentation layer ---

    pub fn nodes(&self) -> &[Node] {
        self.store.nodes()
    }

    pub fn edges(&self) -> &[Edge] {
        self.store.edges()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.store.node(id)
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn save_status(&self) -> SaveStatus {
        self.gateway.status()
    }

    pub fn events(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn history_depth(&self) -> usize {
        self.store.history_depth()
    }

    /// Node/edge counts and DAG verdict over the current graph.
    pub fn report(&self) -> PipelineReport {
        analyze(self.store.nodes(), self.store.edges())
    }

    // --- Mutation intents ---

    /// Allocate an id and drop a node of `kind` at `position`.
    pub fn spawn_node(&mut self, kind: NodeKind, position: Position) -> String {
        let id = self.store.spawn_node(kind, position);
        self.emitter.emit(CanvasEvent::NodeAdded {
            node_id: id.clone(),
        });
        id
    }

    /// Insert a fully formed node (the caller obtained its id via
    /// [`CanvasStore::next_id`]).
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        let node_id = node.id.clone();
        self.store.add_node(node)?;
        self.emitter.emit(CanvasEvent::NodeAdded { node_id });
        Ok(())
    }

    /// Issue a fresh id for `kind`.
    pub fn next_id(&mut self, kind: NodeKind) -> String {
        self.store.next_id(kind)
    }

    pub fn remove_node(&mut self, id: &str) {
        let cascaded_edges = self.store.remove_node(id);
        self.emitter.emit(CanvasEvent::NodeRemoved {
            node_id: id.to_string(),
            cascaded_edges,
        });
    }

    pub fn delete_edge(&mut self, id: &str) {
        self.store.delete_edge(id);
        self.emitter.emit(CanvasEvent::EdgeDeleted {
            edge_id: id.to_string(),
        });
    }

    /// Propose a connection; rejections surface both as the returned error
    /// and as a [`CanvasEvent::ConnectionRejected`] notice.
    pub fn connect(&mut self, proposal: ConnectionProposal) -> Result<String> {
        let source = proposal.source.clone();
        let target = proposal.target.clone();
        match self.store.connect(proposal) {
            Ok(edge_id) => {
                self.emitter.emit(CanvasEvent::EdgeConnected {
                    edge_id: edge_id.clone(),
                    source,
                    target,
                });
                Ok(edge_id)
            }
            Err(err) => {
                if matches!(err, FlowboardError::ConnectionRejected { .. }) {
                    self.emitter.emit(CanvasEvent::ConnectionRejected {
                        source,
                        target,
                        reason: err.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    pub fn update_node_field(
        &mut self,
        id: &str,
        field: impl Into<String>,
        value: serde_json::Value,
    ) {
        self.store.update_node_field(id, field, value);
    }

    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        self.store.apply_node_changes(changes);
    }

    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        self.store.apply_edge_changes(changes);
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        let changed = self.store.undo();
        if changed {
            self.emitter.emit(CanvasEvent::UndoApplied);
        }
        changed
    }

    pub fn redo(&mut self) -> bool {
        let changed = self.store.redo();
        if changed {
            self.emitter.emit(CanvasEvent::RedoApplied);
        }
        changed
    }

    // --- Simulation ---

    /// Start a simulation over a snapshot of the current graph.
    ///
    /// Later edits never affect the returned run; a second `run` while one
    /// is in progress is rejected with [`FlowboardError::SimulationBusy`].
    pub fn run(&self) -> Result<impl Future<Output = ()> + Send + 'static> {
        self.engine.start(self.store.nodes(), self.store.edges())
    }

    // --- Persistence ---

    /// Persist the current graph in the background, driving the status
    /// indicator through its full sequence.
    pub fn save(&self) -> tokio::task::JoinHandle<Result<()>> {
        let gateway = self.gateway.clone();
        let nodes = self.store.nodes().to_vec();
        let edges = self.store.edges().to_vec();
        tokio::spawn(async move { gateway.save(&nodes, &edges).await })
    }

    /// One-time load of the persisted graph. Replaces the live graph and
    /// clears both history stacks on a hit; returns whether anything was
    /// loaded.
    pub async fn load(&mut self) -> Result<bool> {
        match self.gateway.load().await? {
            Some((nodes, edges)) => {
                self.store.set_pipeline(nodes, edges);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Empty the canvas, the history stacks, and the overlay highlights,
    /// then persist the empty state.
    pub fn clear_canvas(&mut self) -> tokio::task::JoinHandle<Result<()>> {
        self.store.clear();
        self.overlay.clear_highlights();
        self.emitter.emit(CanvasEvent::CanvasCleared);
        self.save()
    }

    /// Replace the graph wholesale (template application) and persist it.
    pub fn set_pipeline(
        &mut self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> tokio::task::JoinHandle<Result<()>> {
        self.store.set_pipeline(nodes, edges);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::simulation::InstantClock;

    fn session() -> EditorSession {
        EditorSession::new(Arc::new(MemoryStore::new()), Arc::new(InstantClock))
    }

    #[tokio::test]
    async fn mutations_emit_events() {
        let mut session = session();
        let mut rx = session.events().subscribe();

        let input = session.spawn_node(NodeKind::Input, Position::default());
        let llm = session.spawn_node(NodeKind::Llm, Position::default());
        session.connect(ConnectionProposal::new(&input, &llm)).unwrap();
        session.remove_node(&llm);

        assert!(matches!(rx.try_recv().unwrap(), CanvasEvent::NodeAdded { .. }));
        assert!(matches!(rx.try_recv().unwrap(), CanvasEvent::NodeAdded { .. }));
        assert!(matches!(rx.try_recv().unwrap(), CanvasEvent::EdgeConnected { .. }));
        match rx.try_recv().unwrap() {
            CanvasEvent::NodeRemoved {
                node_id,
                cascaded_edges,
            } => {
                assert_eq!(node_id, llm);
                assert_eq!(cascaded_edges, 1);
            }
            other => panic!("expected NodeRemoved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_connection_surfaces_a_notice() {
        let mut session = session();
        let mut rx = session.events().subscribe();

        let slack = session.spawn_node(NodeKind::Slack, Position::default());
        let llm = session.spawn_node(NodeKind::Llm, Position::default());
        let err = session
            .connect(ConnectionProposal::new(&slack, &llm))
            .unwrap_err();
        assert!(matches!(err, FlowboardError::ConnectionRejected { .. }));

        let notice = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|e| matches!(e, CanvasEvent::ConnectionRejected { .. }))
            .expect("a rejection notice is emitted");
        match notice {
            CanvasEvent::ConnectionRejected { reason, .. } => {
                assert_eq!(reason, "Cannot connect slack to llm");
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn save_then_load_in_a_fresh_session_round_trips() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut first =
            EditorSession::new(Arc::clone(&storage), Arc::new(InstantClock));

        let input = first.spawn_node(NodeKind::Input, Position::new(0.0, 0.0));
        let llm = first.spawn_node(NodeKind::Llm, Position::new(250.0, 0.0));
        first.connect(ConnectionProposal::new(&input, &llm)).unwrap();
        first.update_node_field(&input, "inputName", serde_json::json!("question"));
        first.save().await.unwrap().unwrap();

        let mut second = EditorSession::new(storage, Arc::new(InstantClock));
        assert!(second.load().await.unwrap());
        assert_eq!(second.nodes(), first.nodes());
        assert_eq!(second.edges(), first.edges());
        assert_eq!(second.history_depth(), 0, "a loaded graph starts with fresh history");
    }

    #[tokio::test]
    async fn load_on_an_empty_store_reports_nothing_to_load() {
        let mut session = session();
        assert!(!session.load().await.unwrap());
        assert!(session.nodes().is_empty());
    }

    #[tokio::test]
    async fn clear_canvas_persists_the_empty_state() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut session = EditorSession::new(Arc::clone(&storage), Arc::new(InstantClock));
        session.spawn_node(NodeKind::Note, Position::default());
        session.save().await.unwrap().unwrap();

        session.clear_canvas().await.unwrap().unwrap();
        assert!(session.nodes().is_empty());
        assert_eq!(session.history_depth(), 0);

        let mut fresh = EditorSession::new(storage, Arc::new(InstantClock));
        assert!(fresh.load().await.unwrap(), "the empty state was persisted");
        assert!(fresh.nodes().is_empty());
    }

    #[tokio::test]
    async fn report_reflects_the_live_graph() {
        let mut session = session();
        let text = session.spawn_node(NodeKind::Text, Position::default());
        let llm = session.spawn_node(NodeKind::Llm, Position::default());
        session.connect(ConnectionProposal::new(&text, &llm)).unwrap();

        let report = session.report();
        assert_eq!(report.num_nodes, 2);
        assert_eq!(report.num_edges, 1);
        assert!(report.is_dag);

        session.connect(ConnectionProposal::new(&llm, &text)).unwrap();
        assert!(!session.report().is_dag);
    }

    #[tokio::test]
    async fn undo_redo_emit_only_when_something_changed() {
        let mut session = session();
        assert!(!session.undo());

        session.spawn_node(NodeKind::Api, Position::default());
        assert!(session.undo());
        assert!(session.redo());
        assert!(!session.redo());
    }
}
