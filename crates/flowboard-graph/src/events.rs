//! Canvas event system for observability.
//!
//! Emits [`CanvasEvent`]s via a [`tokio::sync::broadcast`] channel so that
//! external observers (the presentation layer, loggers, tests) can follow
//! mutations, simulation progress, and save-status transitions without
//! coupling to the core internals.

use serde::{Deserialize, Serialize};

use flowboard_types::SaveStatus;

/// Events emitted by the editor core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CanvasEvent {
    NodeAdded {
        node_id: String,
    },
    NodeRemoved {
        node_id: String,
        cascaded_edges: usize,
    },
    EdgeConnected {
        edge_id: String,
        source: String,
        target: String,
    },
    EdgeDeleted {
        edge_id: String,
    },
    ConnectionRejected {
        source: String,
        target: String,
        reason: String,
    },
    UndoApplied,
    RedoApplied,
    CanvasCleared,
    SimulationStarted {
        layer_count: usize,
    },
    LayerActivated {
        index: usize,
        node_ids: Vec<String>,
    },
    EdgesActivated {
        index: usize,
        edge_ids: Vec<String>,
    },
    SimulationFinished,
    SaveStatusChanged {
        status: SaveStatus,
    },
    PipelineSaved {
        node_count: usize,
        edge_count: usize,
    },
    PipelineLoaded {
        node_count: usize,
        edge_count: usize,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<CanvasEvent>,
}

impl EventEmitter {
    /// Create a new emitter with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: CanvasEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CanvasEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
