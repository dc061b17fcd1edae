//! Bounded, directional reachability search over a graph snapshot.
//!
//! Traversal is breadth-first and level-synchronous, so the depth reported
//! for every visited node is the shortest hop count from the start node
//! respecting the requested direction. A per-traversal visited set makes the
//! walk cycle-safe and bounds unlimited traversals to O(V+E).
//!
//! `Both` runs two independent single-direction passes and merges them,
//! keeping the minimum depth found in either direction and recording which
//! direction(s) reached each node.

use super::model::{AssetKind, AssetNode, EdgeKind};
use super::snapshot::GraphSnapshot;
use crate::error::{Result, TrellisError};
use crate::types::{AssetId, EdgeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Traversal direction relative to the start node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow edges backwards to data sources.
    Upstream,
    /// Follow edges forwards to consumers.
    Downstream,
    /// Merge of both passes.
    Both,
}

/// Options controlling a traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalOptions {
    /// Direction of the walk.
    pub direction: Direction,
    /// Maximum depth in hops; 0 means unlimited.
    pub max_depth: usize,
    /// If set, only edges of these kinds are followed.
    pub edge_kinds: Option<Vec<EdgeKind>>,
    /// If set, only nodes of these kinds are visited or expanded.
    pub node_kinds: Option<Vec<AssetKind>>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Downstream,
            max_depth: 0,
            edge_kinds: None,
            node_kinds: None,
        }
    }
}

impl TraversalOptions {
    /// Downstream, unlimited depth, no filters.
    pub fn downstream() -> Self {
        Self::default()
    }

    /// Upstream, unlimited depth, no filters.
    pub fn upstream() -> Self {
        Self {
            direction: Direction::Upstream,
            ..Self::default()
        }
    }

    /// Both directions, unlimited depth, no filters.
    pub fn both() -> Self {
        Self {
            direction: Direction::Both,
            ..Self::default()
        }
    }

    /// Sets the depth bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Restricts followed edge kinds.
    pub fn with_edge_kinds(mut self, kinds: Vec<EdgeKind>) -> Self {
        self.edge_kinds = Some(kinds);
        self
    }

    /// Restricts visited node kinds.
    pub fn with_node_kinds(mut self, kinds: Vec<AssetKind>) -> Self {
        self.node_kinds = Some(kinds);
        self
    }
}

/// Which direction(s) reached a node in a `Both` traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachedFrom {
    /// Reached by the upstream pass.
    pub upstream: bool,
    /// Reached by the downstream pass.
    pub downstream: bool,
}

/// One visited node with its shortest depth and path back to the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalEntry {
    /// The visited node.
    pub node: AssetNode,
    /// Shortest hop count from the start respecting direction.
    pub depth: usize,
    /// Edge ids along one shortest path from the start to this node.
    pub path_edges: Vec<EdgeId>,
    /// Direction(s) that reached this node.
    pub reached: ReachedFrom,
}

/// Result of a traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalResult {
    /// Start node id.
    pub start_id: AssetId,
    /// Visited nodes in deterministic BFS order, start first at depth 0.
    pub visited: Vec<TraversalEntry>,
    /// True if a depth bound cut off reachable nodes.
    pub truncated: bool,
}

impl TraversalResult {
    /// Visited nodes excluding the start node.
    pub fn affected(&self) -> impl Iterator<Item = &TraversalEntry> {
        self.visited.iter().filter(move |e| e.node.id != self.start_id)
    }

    /// Number of affected (non-start) nodes.
    pub fn affected_count(&self) -> usize {
        self.affected().count()
    }

    /// Looks up the entry for a node.
    pub fn entry(&self, id: &str) -> Option<&TraversalEntry> {
        self.visited.iter().find(|e| e.node.id == id)
    }
}

/// Runs a traversal. Fails with `NodeNotFound` if the start node is absent
/// from the snapshot.
pub fn traverse(
    snapshot: &GraphSnapshot,
    start_id: &str,
    options: &TraversalOptions,
) -> Result<TraversalResult> {
    traverse_cancellable(snapshot, start_id, options, None)
}

/// Runs a traversal with a cooperative cancellation flag, checked between
/// BFS levels so cancellation latency is bounded by one level.
pub fn traverse_cancellable(
    snapshot: &GraphSnapshot,
    start_id: &str,
    options: &TraversalOptions,
    cancel: Option<&AtomicBool>,
) -> Result<TraversalResult> {
    if !snapshot.contains_node(start_id) {
        return Err(TrellisError::NodeNotFound(start_id.to_string()));
    }

    match options.direction {
        Direction::Upstream | Direction::Downstream => {
            single_pass(snapshot, start_id, options, options.direction, cancel)
        }
        Direction::Both => {
            let down = single_pass(snapshot, start_id, options, Direction::Downstream, cancel)?;
            let up = single_pass(snapshot, start_id, options, Direction::Upstream, cancel)?;
            Ok(merge_passes(start_id, down, up))
        }
    }
}

fn edge_allowed(options: &TraversalOptions, kind: EdgeKind) -> bool {
    options
        .edge_kinds
        .as_ref()
        .map(|kinds| kinds.contains(&kind))
        .unwrap_or(true)
}

fn node_allowed(options: &TraversalOptions, kind: AssetKind) -> bool {
    options
        .node_kinds
        .as_ref()
        .map(|kinds| kinds.contains(&kind))
        .unwrap_or(true)
}

/// Level-synchronous BFS in a single direction. The frontier is expanded one
/// full level at a time; first-reached depth wins, which with BFS is the
/// shortest-path depth even on cyclic input.
fn single_pass(
    snapshot: &GraphSnapshot,
    start_id: &str,
    options: &TraversalOptions,
    direction: Direction,
    cancel: Option<&AtomicBool>,
) -> Result<TraversalResult> {
    let reached = match direction {
        Direction::Upstream => ReachedFrom { upstream: true, downstream: false },
        _ => ReachedFrom { upstream: false, downstream: true },
    };

    // node id -> (parent node id, edge id) for path reconstruction
    let mut parents: HashMap<AssetId, (AssetId, EdgeId)> = HashMap::new();
    let mut depths: HashMap<AssetId, usize> = HashMap::new();
    let mut order: Vec<AssetId> = Vec::new();
    let mut truncated = false;

    depths.insert(start_id.to_string(), 0);
    order.push(start_id.to_string());

    let mut frontier = vec![start_id.to_string()];
    let mut depth = 0usize;

    while !frontier.is_empty() {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(TrellisError::Cancelled("traversal".to_string()));
            }
        }

        depth += 1;
        let bounded = options.max_depth > 0 && depth > options.max_depth;
        let mut next = Vec::new();

        for current in &frontier {
            let edges: Vec<(&super::model::LineageEdge, &AssetId)> = match direction {
                Direction::Upstream => snapshot
                    .incoming_edges(current)
                    .map(|e| (e, &e.source_id))
                    .collect(),
                _ => snapshot
                    .outgoing_edges(current)
                    .map(|e| (e, &e.target_id))
                    .collect(),
            };

            for (edge, neighbor) in edges {
                if !edge_allowed(options, edge.kind) {
                    continue;
                }
                if depths.contains_key(neighbor.as_str()) {
                    continue;
                }
                let Some(node) = snapshot.node(neighbor) else {
                    continue;
                };
                if !node_allowed(options, node.kind) {
                    continue;
                }
                if bounded {
                    truncated = true;
                    continue;
                }

                depths.insert(neighbor.clone(), depth);
                parents.insert(neighbor.clone(), (current.clone(), edge.id.clone()));
                order.push(neighbor.clone());
                next.push(neighbor.clone());
            }
        }

        if bounded {
            break;
        }
        frontier = next;
    }

    let visited = order
        .iter()
        .map(|id| TraversalEntry {
            node: snapshot.node(id).cloned().expect("visited node exists"),
            depth: depths[id],
            path_edges: rebuild_path(&parents, start_id, id),
            reached,
        })
        .collect();

    Ok(TraversalResult {
        start_id: start_id.to_string(),
        visited,
        truncated,
    })
}

fn rebuild_path(
    parents: &HashMap<AssetId, (AssetId, EdgeId)>,
    start_id: &str,
    node_id: &str,
) -> Vec<EdgeId> {
    let mut path = Vec::new();
    let mut current = node_id.to_string();
    while current != start_id {
        match parents.get(&current) {
            Some((parent, edge_id)) => {
                path.push(edge_id.clone());
                current = parent.clone();
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Merges a downstream and an upstream pass: minimum depth wins, both
/// reached flags are preserved, and order is (depth, downstream pass first).
fn merge_passes(
    start_id: &str,
    down: TraversalResult,
    up: TraversalResult,
) -> TraversalResult {
    let truncated = down.truncated || up.truncated;
    let mut merged: Vec<TraversalEntry> = Vec::new();
    let mut index: HashMap<AssetId, usize> = HashMap::new();

    for entry in down.visited.into_iter().chain(up.visited.into_iter()) {
        match index.get(&entry.node.id) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.reached.upstream |= entry.reached.upstream;
                existing.reached.downstream |= entry.reached.downstream;
                // Minimum depth wins; the downstream pass came first, so on
                // a tie its path is kept.
                if entry.depth < existing.depth {
                    existing.depth = entry.depth;
                    existing.path_edges = entry.path_edges;
                }
            }
            None => {
                index.insert(entry.node.id.clone(), merged.len());
                merged.push(entry);
            }
        }
    }

    // Stable: within a depth, downstream-pass discovery order is preserved.
    merged.sort_by_key(|e| e.depth);

    TraversalResult {
        start_id: start_id.to_string(),
        visited: merged,
        truncated,
    }
}

/// Finds one shortest downstream path between two nodes, as node ids
/// including both endpoints. Returns `None` when unreachable.
pub fn shortest_path(
    snapshot: &GraphSnapshot,
    from: &str,
    to: &str,
) -> Result<Option<Vec<AssetId>>> {
    let result = traverse(snapshot, from, &TraversalOptions::downstream())?;
    let Some(entry) = result.entry(to) else {
        return Ok(None);
    };

    let mut path = vec![from.to_string()];
    for edge_id in &entry.path_edges {
        if let Some(edge) = snapshot.edge(edge_id) {
            path.push(edge.target_id.clone());
        }
    }
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::super::model::{AssetKind, AssetNode, EdgeKind, LineageEdge};
    use super::super::store::GraphStore;
    use super::*;

    async fn chain() -> GraphSnapshot {
        let store = GraphStore::new();
        for id in ["a", "b", "c", "d"] {
            store.add_node(AssetNode::new(id, AssetKind::Table, id)).await.unwrap();
        }
        store.add_edge(LineageEdge::new("a", "b", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("b", "c", EdgeKind::Aggregation)).await.unwrap();
        store.add_edge(LineageEdge::new("c", "d", EdgeKind::Direct)).await.unwrap();
        store.snapshot().await
    }

    #[tokio::test]
    async fn test_downstream_depths() {
        let snap = chain().await;
        let result = traverse(&snap, "a", &TraversalOptions::downstream()).unwrap();

        assert_eq!(result.visited.len(), 4);
        assert_eq!(result.entry("a").unwrap().depth, 0);
        assert_eq!(result.entry("b").unwrap().depth, 1);
        assert_eq!(result.entry("c").unwrap().depth, 2);
        assert_eq!(result.entry("d").unwrap().depth, 3);
        assert!(!result.truncated);
        assert_eq!(result.affected_count(), 3);
    }

    #[tokio::test]
    async fn test_upstream_reverses_edges() {
        let snap = chain().await;
        let result = traverse(&snap, "d", &TraversalOptions::upstream()).unwrap();

        assert_eq!(result.visited.len(), 4);
        assert_eq!(result.entry("c").unwrap().depth, 1);
        assert_eq!(result.entry("a").unwrap().depth, 3);
        assert!(result.entry("a").unwrap().reached.upstream);
    }

    #[tokio::test]
    async fn test_max_depth_truncation() {
        let snap = chain().await;
        let opts = TraversalOptions::downstream().with_max_depth(2);
        let result = traverse(&snap, "a", &opts).unwrap();

        assert_eq!(result.visited.len(), 3);
        assert!(result.entry("d").is_none());
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_unlimited_depth_is_zero() {
        let snap = chain().await;
        let opts = TraversalOptions::downstream().with_max_depth(0);
        let result = traverse(&snap, "a", &opts).unwrap();
        assert_eq!(result.visited.len(), 4);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_node_not_found() {
        let snap = chain().await;
        let err = traverse(&snap, "ghost", &TraversalOptions::downstream()).unwrap_err();
        assert!(matches!(err, TrellisError::NodeNotFound(_)));
    }

    #[tokio::test]
    async fn test_cycle_terminates_each_node_once() {
        let store = GraphStore::new();
        for id in ["x", "y", "z"] {
            store.add_node(AssetNode::new(id, AssetKind::Table, id)).await.unwrap();
        }
        store.add_edge(LineageEdge::new("x", "y", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("y", "z", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("z", "x", EdgeKind::Direct)).await.unwrap();
        let snap = store.snapshot().await;

        let result = traverse(&snap, "x", &TraversalOptions::downstream()).unwrap();
        assert_eq!(result.visited.len(), 3);
        let mut ids: Vec<&str> = result.visited.iter().map(|e| e.node.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_both_direction_merge() {
        // up1 -> mid -> down1 -> down2
        let store = GraphStore::new();
        for id in ["up1", "mid", "down1", "down2"] {
            store.add_node(AssetNode::new(id, AssetKind::Table, id)).await.unwrap();
        }
        store.add_edge(LineageEdge::new("up1", "mid", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("mid", "down1", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("down1", "down2", EdgeKind::Direct)).await.unwrap();
        let snap = store.snapshot().await;

        let result = traverse(&snap, "mid", &TraversalOptions::both()).unwrap();
        assert_eq!(result.visited.len(), 4);

        let up = result.entry("up1").unwrap();
        assert_eq!(up.depth, 1);
        assert!(up.reached.upstream && !up.reached.downstream);

        let down = result.entry("down1").unwrap();
        assert!(down.reached.downstream && !down.reached.upstream);

        let start = result.entry("mid").unwrap();
        assert!(start.reached.upstream && start.reached.downstream);
    }

    #[tokio::test]
    async fn test_both_keeps_minimum_depth() {
        // Cycle a -> b -> c -> a: from a, c is 2 hops downstream but 1 hop
        // upstream. Merge must report depth 1.
        let store = GraphStore::new();
        for id in ["a", "b", "c"] {
            store.add_node(AssetNode::new(id, AssetKind::Table, id)).await.unwrap();
        }
        store.add_edge(LineageEdge::new("a", "b", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("b", "c", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("c", "a", EdgeKind::Direct)).await.unwrap();
        let snap = store.snapshot().await;

        let result = traverse(&snap, "a", &TraversalOptions::both()).unwrap();
        let c = result.entry("c").unwrap();
        assert_eq!(c.depth, 1);
        assert!(c.reached.upstream && c.reached.downstream);
    }

    #[tokio::test]
    async fn test_edge_kind_filter() {
        let snap = chain().await;
        let opts = TraversalOptions::downstream().with_edge_kinds(vec![EdgeKind::Direct]);
        let result = traverse(&snap, "a", &opts).unwrap();

        // b -> c is an aggregation edge, so traversal stops at b.
        assert_eq!(result.visited.len(), 2);
        assert!(result.entry("c").is_none());
    }

    #[tokio::test]
    async fn test_node_kind_filter() {
        let store = GraphStore::new();
        store.add_node(AssetNode::new("t", AssetKind::Table, "T")).await.unwrap();
        store.add_node(AssetNode::new("r", AssetKind::Report, "R")).await.unwrap();
        store.add_node(AssetNode::new("t2", AssetKind::Table, "T2")).await.unwrap();
        store.add_edge(LineageEdge::new("t", "r", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("t", "t2", EdgeKind::Direct)).await.unwrap();
        let snap = store.snapshot().await;

        let opts = TraversalOptions::downstream().with_node_kinds(vec![AssetKind::Table]);
        let result = traverse(&snap, "t", &opts).unwrap();
        assert!(result.entry("r").is_none());
        assert!(result.entry("t2").is_some());
    }

    #[tokio::test]
    async fn test_determinism() {
        let snap = chain().await;
        let opts = TraversalOptions::both();
        let first = traverse(&snap, "b", &opts).unwrap();
        let second = traverse(&snap, "b", &opts).unwrap();

        let ids = |r: &TraversalResult| -> Vec<(String, usize)> {
            r.visited.iter().map(|e| (e.node.id.clone(), e.depth)).collect()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_path_edges() {
        let snap = chain().await;
        let result = traverse(&snap, "a", &TraversalOptions::downstream()).unwrap();
        let d = result.entry("d").unwrap();
        assert_eq!(d.path_edges, vec!["a->b", "b->c", "c->d"]);
    }

    #[tokio::test]
    async fn test_shortest_path() {
        let snap = chain().await;
        let path = shortest_path(&snap, "a", "d").unwrap().unwrap();
        assert_eq!(path, vec!["a", "b", "c", "d"]);
        assert!(shortest_path(&snap, "d", "a").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancellation_flag() {
        let snap = chain().await;
        let flag = AtomicBool::new(true);
        let err = traverse_cancellable(
            &snap,
            "a",
            &TraversalOptions::downstream(),
            Some(&flag),
        )
        .unwrap_err();
        assert!(matches!(err, TrellisError::Cancelled(_)));
    }
}
