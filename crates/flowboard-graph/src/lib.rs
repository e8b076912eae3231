//! Graph state and simulation core for the Flowboard pipeline editor.
//!
//! This crate implements the authoritative in-memory model of a pipeline graph:
//! id allocation, the canvas store with its mutation primitives, connection
//! rules, snapshot-based undo/redo, durable save/load with a debounced status
//! indicator, and the timed layered-traversal simulation that previews
//! execution order without invoking any pipeline step.

pub mod allocator;
pub mod events;
pub mod history;
pub mod persistence;
pub mod report;
pub mod rules;
pub mod session;
pub mod simulation;
pub mod store;

pub use allocator::IdAllocator;
pub use events::{CanvasEvent, EventEmitter};
pub use history::{History, Snapshot, DEFAULT_HISTORY_CAP};
pub use persistence::{
    FsStore, KeyValueStore, MemoryStore, PersistenceGateway, SaveTimings, EDGES_KEY, NODES_KEY,
};
pub use report::{analyze, PipelineReport};
pub use rules::{ConnectionRules, Targets};
pub use session::EditorSession;
pub use simulation::{
    plan_traversal, Clock, InstantClock, Overlay, OverlayState, SimulationEngine,
    SimulationTimings, SystemClock, TraversalLayer,
};
pub use store::{CanvasStore, ConnectionProposal};
