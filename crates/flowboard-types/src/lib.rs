//! Shared types and errors for the Flowboard pipeline editor core.
//!
//! This crate provides the foundational types used across the other Flowboard crates:
//! - `FlowboardError` — unified error taxonomy
//! - `NodeKind` — the closed set of node kinds the editor offers
//! - `Node` / `Edge` — the canonical graph records
//! - `NodeChange` / `EdgeChange` — bulk deltas from the presentation layer
//! - `SaveStatus` — the persistence status indicator

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unified error type for all Flowboard subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FlowboardError {
    // === Graph Store Errors ===
    #[error("Cannot connect {source} to {target}")]
    ConnectionRejected { source: NodeKind, target: NodeKind },

    #[error("Node '{0}' already exists on the canvas")]
    DuplicateNode(String),

    #[error("Connection references unknown node '{0}'")]
    UnknownNode(String),

    // === Simulation Errors ===
    #[error("A simulation is already running")]
    SimulationBusy,

    // === Model Errors ===
    #[error("Unknown node kind '{0}'")]
    UnknownKind(String),

    // === Persistence Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience alias for `Result<T, FlowboardError>`.
pub type Result<T> = std::result::Result<T, FlowboardError>;

// ---------------------------------------------------------------------------
// NodeKind — the closed set of node kinds
// ---------------------------------------------------------------------------

/// The node kinds the editor palette offers.
///
/// Serialized with the wire names the durable format uses (`customInput`,
/// `llm`, ...). The wire name doubles as the id prefix handed out by the
/// allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "customInput")]
    Input,
    #[serde(rename = "llm")]
    Llm,
    #[serde(rename = "customOutput")]
    Output,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "timer")]
    Timer,
    #[serde(rename = "api")]
    Api,
    #[serde(rename = "database")]
    Database,
    #[serde(rename = "slack")]
    Slack,
    #[serde(rename = "note")]
    Note,
}

impl NodeKind {
    /// The wire name, also used as the allocator id prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Input => "customInput",
            NodeKind::Llm => "llm",
            NodeKind::Output => "customOutput",
            NodeKind::Text => "text",
            NodeKind::Timer => "timer",
            NodeKind::Api => "api",
            NodeKind::Database => "database",
            NodeKind::Slack => "slack",
            NodeKind::Note => "note",
        }
    }

    /// Every kind, in palette order.
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Input,
            NodeKind::Llm,
            NodeKind::Output,
            NodeKind::Text,
            NodeKind::Timer,
            NodeKind::Api,
            NodeKind::Database,
            NodeKind::Slack,
            NodeKind::Note,
        ]
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// `FlowboardError::ConnectionRejected` carries `source`/`target` fields of this
// type; thiserror treats any field named `source` as the error source, which
// requires the field type to implement `std::error::Error`.
impl std::error::Error for NodeKind {}

impl FromStr for NodeKind {
    type Err = FlowboardError;

    fn from_str(s: &str) -> Result<Self> {
        NodeKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FlowboardError::UnknownKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A vertex in the pipeline graph representing one pipeline step.
///
/// `id` is unique and immutable after creation; `data` is an open mapping of
/// kind-specific fields owned by the node's form widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    /// A node with empty data at the given position.
    pub fn new(id: impl Into<String>, kind: NodeKind, position: Position) -> Self {
        Self {
            id: id.into(),
            kind,
            position,
            data: serde_json::Map::new(),
            selected: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Arrow marker drawn at the target end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrowMarker {
    pub width: u32,
    pub height: u32,
}

impl Default for ArrowMarker {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
        }
    }
}

/// Visual attributes every committed connection receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub animated: bool,
    #[serde(rename = "strokeWidth")]
    pub stroke_width: u32,
    #[serde(rename = "markerEnd")]
    pub marker: ArrowMarker,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            animated: true,
            stroke_width: 2,
            marker: ArrowMarker::default(),
        }
    }
}

/// A directed connection from one node's output handle to another's input
/// handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default)]
    pub source_handle: String,
    #[serde(rename = "targetHandle", default)]
    pub target_handle: String,
    #[serde(default)]
    pub style: EdgeStyle,
    #[serde(default)]
    pub selected: bool,
}

// ---------------------------------------------------------------------------
// Presentation-layer change deltas
// ---------------------------------------------------------------------------

/// A bulk delta the presentation layer applies to a node outside the undo
/// history (drag, select, delete-key removal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NodeChange {
    Moved { id: String, position: Position },
    Selected { id: String, selected: bool },
    Removed { id: String },
}

/// A bulk delta the presentation layer applies to an edge outside the undo
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EdgeChange {
    Selected { id: String, selected: bool },
    Removed { id: String },
}

// ---------------------------------------------------------------------------
// SaveStatus
// ---------------------------------------------------------------------------

/// Persistence status surfaced to the header indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
}
