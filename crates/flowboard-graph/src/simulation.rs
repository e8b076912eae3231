//! Layered graph-traversal simulation.
//!
//! The simulation previews execution order without invoking any pipeline
//! step. It is split into a pure planner ([`plan_traversal`]) and a timed
//! driver ([`SimulationEngine`]) so traversal order is testable without
//! wall-clock waits: the driver sleeps through an injected [`Clock`].
//!
//! Highlight state lives in a transient [`OverlayState`] published through a
//! watch channel; the presentation layer merges it at render time and it is
//! never persisted.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use flowboard_types::{Edge, FlowboardError, Node, Result};

use crate::events::{CanvasEvent, EventEmitter};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Delay primitive the driver suspends on at each phase boundary.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock delays via `tokio::time::sleep`.
#[derive(Debug, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A clock that never waits. Used by tests and fast CLI runs.
#[derive(Debug, Default)]
pub struct InstantClock;

#[async_trait]
impl Clock for InstantClock {
    async fn sleep(&self, _duration: Duration) {}
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

/// Transient highlight state describing simulated execution progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    pub is_running: bool,
    pub active_nodes: HashSet<String>,
    pub active_edges: HashSet<String>,
}

/// Shared handle to the overlay watch channel.
///
/// Readers take cheap synchronous snapshots; the driver is the only writer.
#[derive(Clone)]
pub struct Overlay {
    tx: Arc<watch::Sender<OverlayState>>,
}

impl Overlay {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(OverlayState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Current overlay state, cloned.
    pub fn snapshot(&self) -> OverlayState {
        self.tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.tx.borrow().is_running
    }

    /// Subscribe to overlay updates.
    pub fn subscribe(&self) -> watch::Receiver<OverlayState> {
        self.tx.subscribe()
    }

    /// Drop the highlight sets without touching the running flag.
    pub(crate) fn clear_highlights(&self) {
        self.tx.send_modify(|state| {
            state.active_nodes.clear();
            state.active_edges.clear();
        });
    }

    fn begin_run(&self) {
        self.tx.send_modify(|state| {
            state.is_running = true;
            state.active_nodes.clear();
            state.active_edges.clear();
        });
    }

    fn activate_nodes(&self, ids: &[String]) {
        self.tx.send_modify(|state| {
            state.active_nodes.extend(ids.iter().cloned());
        });
    }

    fn activate_edges(&self, ids: &[String]) {
        self.tx.send_modify(|state| {
            state.active_edges.extend(ids.iter().cloned());
        });
    }

    /// Tear down the overlay in one atomic update.
    fn finish_run(&self) {
        self.tx.send_modify(|state| {
            state.is_running = false;
            state.active_nodes.clear();
            state.active_edges.clear();
        });
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// The node ids and outgoing edge ids processed together in one traversal
/// step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalLayer {
    pub nodes: Vec<String>,
    pub edges: Vec<String>,
}

/// Compute the layered traversal order for a graph snapshot.
///
/// The initial frontier is every node with in-degree zero, in node-list
/// order; a fully cyclic non-empty graph falls back to the single first
/// node. A global visited set expands each node at most once, so the plan
/// has at most one layer per node regardless of cycles. A layer records the
/// whole frontier (already-visited members included) plus the edge ids
/// leaving its newly visited members.
pub fn plan_traversal(nodes: &[Node], edges: &[Edge]) -> Vec<TraversalLayer> {
    let mut adjacency: HashMap<&str, Vec<(&str, &str)>> = nodes
        .iter()
        .map(|n| (n.id.as_str(), Vec::new()))
        .collect();
    for edge in edges {
        adjacency
            .entry(edge.source.as_str())
            .or_default()
            .push((edge.target.as_str(), edge.id.as_str()));
    }

    let mut in_degree: HashMap<&str, usize> =
        nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    for edge in edges {
        *in_degree.entry(edge.target.as_str()).or_insert(0) += 1;
    }

    let mut frontier: Vec<String> = nodes
        .iter()
        .filter(|n| in_degree[n.id.as_str()] == 0)
        .map(|n| n.id.clone())
        .collect();
    if frontier.is_empty() && !nodes.is_empty() {
        frontier = vec![nodes[0].id.clone()];
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut layers = Vec::new();

    while !frontier.is_empty() {
        let mut layer_edges: Vec<String> = Vec::new();
        let mut candidates: Vec<String> = Vec::new();

        for node_id in &frontier {
            if visited.contains(node_id) {
                continue;
            }
            visited.insert(node_id.clone());

            if let Some(neighbors) = adjacency.get(node_id.as_str()) {
                for (target, edge_id) in neighbors {
                    layer_edges.push((*edge_id).to_string());
                    if !visited.contains(*target) {
                        candidates.push((*target).to_string());
                    }
                }
            }
        }

        // De-duplicate in first-seen order.
        let mut seen = HashSet::new();
        let next: Vec<String> = candidates
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        layers.push(TraversalLayer {
            nodes: frontier,
            edges: layer_edges,
        });
        frontier = next;
    }

    layers
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Phase durations for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTimings {
    /// Nodes-lit phase after each layer is highlighted.
    pub node_phase: Duration,
    /// Packet-flow phase after a layer's edges are highlighted.
    pub edge_phase: Duration,
    /// Final pause before the overlay is torn down.
    pub cool_down: Duration,
}

impl Default for SimulationTimings {
    fn default() -> Self {
        Self {
            node_phase: Duration::from_millis(500),
            edge_phase: Duration::from_millis(800),
            cool_down: Duration::from_millis(2000),
        }
    }
}

/// Drives a timed highlight sequence over a graph snapshot.
pub struct SimulationEngine {
    overlay: Overlay,
    clock: Arc<dyn Clock>,
    timings: SimulationTimings,
    emitter: EventEmitter,
}

impl SimulationEngine {
    pub fn new(
        overlay: Overlay,
        clock: Arc<dyn Clock>,
        timings: SimulationTimings,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            overlay,
            clock,
            timings,
            emitter,
        }
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    /// Begin a run over a snapshot of the graph.
    ///
    /// The running flag flips and the plan is computed before this returns,
    /// so later graph edits never alter the traversal and a second `start`
    /// is rejected with [`FlowboardError::SimulationBusy`] until the run
    /// finishes. The returned future performs the timed phases; awaiting it
    /// (or spawning it) drives the run to completion. Node highlight of
    /// layer k strictly precedes edge highlight of layer k, which strictly
    /// precedes node highlight of layer k+1.
    pub fn start(
        &self,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Result<impl Future<Output = ()> + Send + 'static> {
        if self.overlay.is_running() {
            return Err(FlowboardError::SimulationBusy);
        }

        let plan = plan_traversal(nodes, edges);
        self.overlay.begin_run();
        self.emitter.emit(CanvasEvent::SimulationStarted {
            layer_count: plan.len(),
        });
        tracing::info!(layers = plan.len(), "Simulation started");

        let overlay = self.overlay.clone();
        let clock = Arc::clone(&self.clock);
        let timings = self.timings;
        let emitter = self.emitter.clone();

        Ok(async move {
            for (index, layer) in plan.into_iter().enumerate() {
                overlay.activate_nodes(&layer.nodes);
                emitter.emit(CanvasEvent::LayerActivated {
                    index,
                    node_ids: layer.nodes,
                });
                clock.sleep(timings.node_phase).await;

                if !layer.edges.is_empty() {
                    overlay.activate_edges(&layer.edges);
                    emitter.emit(CanvasEvent::EdgesActivated {
                        index,
                        edge_ids: layer.edges,
                    });
                    clock.sleep(timings.edge_phase).await;
                }
            }

            clock.sleep(timings.cool_down).await;
            overlay.finish_run();
            emitter.emit(CanvasEvent::SimulationFinished);
            tracing::info!("Simulation finished");
        })
    }
}
