//! Live graph store for the lineage catalog.
//!
//! The [`GraphStore`] owns the authoritative node and edge collections and
//! enforces referential integrity at insert time. Mutations are serialized
//! through write locks; readers take cheap point-in-time snapshots and never
//! block on writers once a snapshot is in hand.
//!
//! Every successful mutation bumps a monotonic version counter. Consumers
//! holding cached metrics compare their snapshot's version against
//! [`GraphStore::version`] to detect staleness.

use super::model::{AssetNode, LineageEdge};
use super::snapshot::GraphSnapshot;
use crate::error::{Result, TrellisError};
use crate::types::{AssetId, EdgeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Inner mutable state, guarded by one lock so that multi-map mutations
/// (edge + both adjacency indexes) stay atomic and no failed mutation leaves
/// a partial insert behind.
#[derive(Default)]
struct StoreInner {
    nodes: HashMap<AssetId, AssetNode>,
    edges: HashMap<EdgeId, LineageEdge>,
    /// Outgoing edge ids per node, in insertion order.
    outgoing: HashMap<AssetId, Vec<EdgeId>>,
    /// Incoming edge ids per node, in insertion order.
    incoming: HashMap<AssetId, Vec<EdgeId>>,
}

/// Authoritative store for lineage nodes and edges.
pub struct GraphStore {
    inner: Arc<RwLock<StoreInner>>,
    version: AtomicU64,
}

impl GraphStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            version: AtomicU64::new(0),
        }
    }

    /// Current mutation version. Monotonically increasing.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Adds a node. Fails with `DuplicateId` if the id is already present.
    pub async fn add_node(&self, node: AssetNode) -> Result<()> {
        if node.importance < 0.0 {
            return Err(TrellisError::InvalidConfig {
                field: format!("node.{}.importance", node.id),
                reason: "importance must be >= 0".to_string(),
            });
        }

        let mut inner = self.inner.write().await;
        if inner.nodes.contains_key(&node.id) {
            return Err(TrellisError::DuplicateId(node.id));
        }

        debug!(node_id = %node.id, kind = ?node.kind, "Adding node");
        inner.nodes.insert(node.id.clone(), node);
        self.bump_version();
        Ok(())
    }

    /// Adds an edge. Fails with `DanglingReference` if either endpoint is
    /// missing, `InvalidWeight` if strength or confidence are out of range,
    /// and `UnflaggedSelfLoop` for a self-loop not marked recursive.
    pub async fn add_edge(&self, edge: LineageEdge) -> Result<()> {
        if edge.strength < 0.0 || !edge.strength.is_finite() {
            return Err(TrellisError::InvalidWeight {
                edge_id: edge.id,
                reason: format!("strength must be finite and >= 0, got {}", edge.strength),
            });
        }
        if !(0.0..=1.0).contains(&edge.confidence) {
            return Err(TrellisError::InvalidWeight {
                edge_id: edge.id,
                reason: format!("confidence must be in [0,1], got {}", edge.confidence),
            });
        }
        if edge.is_self_loop() && !edge.recursive {
            return Err(TrellisError::UnflaggedSelfLoop(edge.source_id));
        }

        let mut inner = self.inner.write().await;
        if inner.edges.contains_key(&edge.id) {
            return Err(TrellisError::DuplicateId(edge.id));
        }
        if !inner.nodes.contains_key(&edge.source_id) {
            return Err(TrellisError::DanglingReference {
                edge_id: edge.id,
                node_id: edge.source_id,
            });
        }
        if !inner.nodes.contains_key(&edge.target_id) {
            return Err(TrellisError::DanglingReference {
                edge_id: edge.id,
                node_id: edge.target_id,
            });
        }

        let edge_id = edge.id.clone();
        let source = edge.source_id.clone();
        let target = edge.target_id.clone();

        debug!(edge_id = %edge_id, source = %source, target = %target, "Adding edge");
        inner.edges.insert(edge_id.clone(), edge);
        inner.outgoing.entry(source).or_default().push(edge_id.clone());
        inner.incoming.entry(target).or_default().push(edge_id);
        self.bump_version();
        Ok(())
    }

    /// Removes a node. With `cascade` false, fails with `NodeInUse` if any
    /// incident edge exists; with `cascade` true, incident edges are removed
    /// first. Fails with `NodeNotFound` for an unknown id.
    pub async fn remove_node(&self, id: &str, cascade: bool) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.nodes.contains_key(id) {
            return Err(TrellisError::NodeNotFound(id.to_string()));
        }

        let mut incident: Vec<EdgeId> = Vec::new();
        if let Some(out) = inner.outgoing.get(id) {
            incident.extend(out.iter().cloned());
        }
        if let Some(inc) = inner.incoming.get(id) {
            // A recursive self-loop appears in both indexes once.
            for eid in inc {
                if !incident.contains(eid) {
                    incident.push(eid.clone());
                }
            }
        }

        if !incident.is_empty() && !cascade {
            return Err(TrellisError::NodeInUse {
                id: id.to_string(),
                edge_count: incident.len(),
            });
        }

        for eid in &incident {
            Self::unlink_edge(&mut inner, eid);
        }
        inner.nodes.remove(id);
        inner.outgoing.remove(id);
        inner.incoming.remove(id);

        debug!(node_id = id, removed_edges = incident.len(), "Removed node");
        self.bump_version();
        Ok(())
    }

    /// Removes an edge. Returns whether an edge was removed.
    pub async fn remove_edge(&self, id: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if !inner.edges.contains_key(id) {
            return Ok(false);
        }
        Self::unlink_edge(&mut inner, id);
        self.bump_version();
        Ok(true)
    }

    fn unlink_edge(inner: &mut StoreInner, id: &str) {
        if let Some(edge) = inner.edges.remove(id) {
            if let Some(out) = inner.outgoing.get_mut(&edge.source_id) {
                out.retain(|e| e != id);
            }
            if let Some(inc) = inner.incoming.get_mut(&edge.target_id) {
                inc.retain(|e| e != id);
            }
        }
    }

    /// Gets a node by id.
    pub async fn get_node(&self, id: &str) -> Option<AssetNode> {
        self.inner.read().await.nodes.get(id).cloned()
    }

    /// Gets an edge by id.
    pub async fn get_edge(&self, id: &str) -> Option<LineageEdge> {
        self.inner.read().await.edges.get(id).cloned()
    }

    /// Gets all edges from `source` to `target`.
    pub async fn edges_between(&self, source: &str, target: &str) -> Vec<LineageEdge> {
        let inner = self.inner.read().await;
        let mut result = Vec::new();
        if let Some(edge_ids) = inner.outgoing.get(source) {
            for eid in edge_ids {
                if let Some(edge) = inner.edges.get(eid) {
                    if edge.target_id == target {
                        result.push(edge.clone());
                    }
                }
            }
        }
        result
    }

    /// Lists all nodes, unordered.
    pub async fn list_nodes(&self) -> Vec<AssetNode> {
        self.inner.read().await.nodes.values().cloned().collect()
    }

    /// Number of nodes.
    pub async fn node_count(&self) -> usize {
        self.inner.read().await.nodes.len()
    }

    /// Number of edges.
    pub async fn edge_count(&self) -> usize {
        self.inner.read().await.edges.len()
    }

    /// Takes an immutable point-in-time snapshot. O(V+E); the snapshot is
    /// independent of all subsequent mutation.
    pub async fn snapshot(&self) -> GraphSnapshot {
        let inner = self.inner.read().await;
        GraphSnapshot::new(
            inner.nodes.clone(),
            inner.edges.clone(),
            inner.outgoing.clone(),
            inner.incoming.clone(),
            self.version(),
        )
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
