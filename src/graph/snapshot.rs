//! Point-in-time snapshots of the lineage graph.
//!
//! A [`GraphSnapshot`] is an immutable, structure-sharing view of the store's
//! nodes and edges. Long-running analyses operate on snapshots only, so they
//! are never affected by concurrent mutation of the live store. Cloning a
//! snapshot is cheap (Arc bumps), and taking one is O(V+E).

use super::model::{AssetNode, LineageEdge};
use crate::types::{AssetId, EdgeId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable point-in-time view of nodes and edges.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    nodes: Arc<HashMap<AssetId, AssetNode>>,
    edges: Arc<HashMap<EdgeId, LineageEdge>>,
    /// Outgoing edge ids per node, in insertion order.
    outgoing: Arc<HashMap<AssetId, Vec<EdgeId>>>,
    /// Incoming edge ids per node, in insertion order.
    incoming: Arc<HashMap<AssetId, Vec<EdgeId>>>,
    /// Store version the snapshot was taken at.
    version: u64,
    /// When the snapshot was taken.
    taken_at: DateTime<Utc>,
}

impl GraphSnapshot {
    pub(crate) fn new(
        nodes: HashMap<AssetId, AssetNode>,
        edges: HashMap<EdgeId, LineageEdge>,
        outgoing: HashMap<AssetId, Vec<EdgeId>>,
        incoming: HashMap<AssetId, Vec<EdgeId>>,
        version: u64,
    ) -> Self {
        Self {
            nodes: Arc::new(nodes),
            edges: Arc::new(edges),
            outgoing: Arc::new(outgoing),
            incoming: Arc::new(incoming),
            version,
            taken_at: Utc::now(),
        }
    }

    /// Store version this snapshot reflects. Cached metrics computed from a
    /// snapshot are stale once the live store's version moves past this.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the snapshot was taken.
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Looks up a node.
    pub fn node(&self, id: &str) -> Option<&AssetNode> {
        self.nodes.get(id)
    }

    /// Looks up an edge.
    pub fn edge(&self, id: &str) -> Option<&LineageEdge> {
        self.edges.get(id)
    }

    /// Whether the snapshot contains a node.
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All nodes, unordered.
    pub fn nodes(&self) -> impl Iterator<Item = &AssetNode> {
        self.nodes.values()
    }

    /// All edges, unordered.
    pub fn edges(&self) -> impl Iterator<Item = &LineageEdge> {
        self.edges.values()
    }

    /// Node ids in lexicographic order. Metrics iterate in this order so
    /// results are reproducible across runs.
    pub fn sorted_node_ids(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self.nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Outgoing edges of a node, in edge insertion order.
    pub fn outgoing_edges(&self, id: &str) -> impl Iterator<Item = &LineageEdge> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(move |eid| self.edges.get(eid))
    }

    /// Incoming edges of a node, in edge insertion order.
    pub fn incoming_edges(&self, id: &str) -> impl Iterator<Item = &LineageEdge> {
        self.incoming
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(move |eid| self.edges.get(eid))
    }

    /// Total degree (in + out) of a node.
    pub fn degree(&self, id: &str) -> usize {
        let out = self.outgoing.get(id).map(|v| v.len()).unwrap_or(0);
        let inc = self.incoming.get(id).map(|v| v.len()).unwrap_or(0);
        out + inc
    }

    /// Undirected neighbor set of a node (self excluded). Used by the
    /// clustering coefficient, which treats the graph as undirected.
    pub fn undirected_neighbors(&self, id: &str) -> Vec<AssetId> {
        let mut seen = std::collections::HashSet::new();
        let mut neighbors = Vec::new();
        for edge in self.outgoing_edges(id) {
            if edge.target_id != id && seen.insert(edge.target_id.clone()) {
                neighbors.push(edge.target_id.clone());
            }
        }
        for edge in self.incoming_edges(id) {
            if edge.source_id != id && seen.insert(edge.source_id.clone()) {
                neighbors.push(edge.source_id.clone());
            }
        }
        neighbors
    }

    /// Whether an undirected connection exists between two nodes.
    pub fn connected_undirected(&self, a: &str, b: &str) -> bool {
        self.outgoing_edges(a).any(|e| e.target_id == b)
            || self.incoming_edges(a).any(|e| e.source_id == b)
    }
}
