//! Durable save/load of the graph to keyed storage, with a debounced
//! status indicator.
//!
//! The node list and edge list are independently serialized as JSON under
//! two fixed keys. There is no versioning or migration scheme; readers
//! tolerate absent fields through serde defaults. Writes are local and
//! best-effort, so there is no retry logic.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use flowboard_types::{Edge, Node, Result, SaveStatus};

use crate::events::{CanvasEvent, EventEmitter};
use crate::simulation::Clock;

/// Storage key for the serialized node list.
pub const NODES_KEY: &str = "pipeline_nodes";
/// Storage key for the serialized edge list.
pub const EDGES_KEY: &str = "pipeline_edges";

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// Client-local durable storage, keyed by stable string keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn put(&self, key: &str, value: String) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// File-backed storage: one `<key>.json` file per key under a root
/// directory, created on first write.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FsStore {
    async fn put(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        tokio::fs::write(&path, value).await?;
        tracing::debug!(path = %path.display(), "Stored value");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(tokio::fs::read_to_string(&path).await?))
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: tokio::sync::RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.inner.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.get(key).cloned())
    }
}

// ---------------------------------------------------------------------------
// PersistenceGateway
// ---------------------------------------------------------------------------

/// Delays of the save-status indicator sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTimings {
    /// Pause before "saving" flips to "saved", so the indicator never
    /// flickers.
    pub saved_after: Duration,
    /// Further pause before "saved" fades back to "idle".
    pub idle_after: Duration,
}

impl Default for SaveTimings {
    fn default() -> Self {
        Self {
            saved_after: Duration::from_millis(500),
            idle_after: Duration::from_millis(2000),
        }
    }
}

/// Write-through persistence over a [`KeyValueStore`], with the
/// saving → saved → idle status sequence surfaced through a watch channel.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn KeyValueStore>,
    status: Arc<watch::Sender<SaveStatus>>,
    clock: Arc<dyn Clock>,
    timings: SaveTimings,
    emitter: EventEmitter,
    loaded: Arc<AtomicBool>,
}

impl PersistenceGateway {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        timings: SaveTimings,
        emitter: EventEmitter,
    ) -> Self {
        let (status, _rx) = watch::channel(SaveStatus::Idle);
        Self {
            store,
            status: Arc::new(status),
            clock,
            timings,
            emitter,
            loaded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current status of the indicator.
    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    /// Subscribe to status transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Write the graph to both keys and drive the status sequence to
    /// completion.
    ///
    /// The status flips to `Saving` immediately; `Saved` and `Idle` follow
    /// after the configured delays. Callers that must not wait out the
    /// indicator spawn this future instead of awaiting it.
    pub async fn save(&self, nodes: &[Node], edges: &[Edge]) -> Result<()> {
        self.set_status(SaveStatus::Saving);

        self.store
            .put(NODES_KEY, serde_json::to_string(nodes)?)
            .await?;
        self.store
            .put(EDGES_KEY, serde_json::to_string(edges)?)
            .await?;
        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            "Pipeline persisted"
        );
        self.emitter.emit(CanvasEvent::PipelineSaved {
            node_count: nodes.len(),
            edge_count: edges.len(),
        });

        self.clock.sleep(self.timings.saved_after).await;
        self.set_status(SaveStatus::Saved);
        self.clock.sleep(self.timings.idle_after).await;
        self.set_status(SaveStatus::Idle);
        Ok(())
    }

    /// Read the persisted graph, at most once per session.
    ///
    /// Returns the graph only when **both** keys are present; a partial or
    /// empty store is "nothing to load", not an error. Subsequent calls
    /// return `None` without touching storage.
    pub async fn load(&self) -> Result<Option<(Vec<Node>, Vec<Edge>)>> {
        if self.loaded.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }

        let stored_nodes = self.store.get(NODES_KEY).await?;
        let stored_edges = self.store.get(EDGES_KEY).await?;
        let (Some(raw_nodes), Some(raw_edges)) = (stored_nodes, stored_edges) else {
            return Ok(None);
        };

        let nodes: Vec<Node> = serde_json::from_str(&raw_nodes)?;
        let edges: Vec<Edge> = serde_json::from_str(&raw_edges)?;
        self.emitter.emit(CanvasEvent::PipelineLoaded {
            node_count: nodes.len(),
            edge_count: edges.len(),
        });
        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "Pipeline loaded");
        Ok(Some((nodes, edges)))
    }

    fn set_status(&self, status: SaveStatus) {
        self.status.send_replace(status);
        self.emitter.emit(CanvasEvent::SaveStatusChanged { status });
    }
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
