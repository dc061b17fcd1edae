//! Centrality measures over a graph snapshot.
//!
//! All functions are pure: they read only the snapshot and return fresh
//! maps. Shortest-path measures (closeness, betweenness) are computed per
//! weakly-connected component so that unreachable pairs are excluded rather
//! than treated as infinite distance.

use super::structure::weak_components;
use crate::graph::GraphSnapshot;
use crate::types::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// L2 convergence threshold for power iteration.
const EIGENVECTOR_EPSILON: f64 = 1e-6;

/// Iteration cap for power iteration.
const EIGENVECTOR_MAX_ITERATIONS: usize = 1000;

/// Eigenvector centrality outcome. Non-convergence is a degraded result,
/// not an error: the last iterate is returned with `converged: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenvectorResult {
    /// Per-node scores, L2-normalized.
    pub scores: HashMap<AssetId, f64>,
    /// Whether power iteration converged within the iteration cap.
    pub converged: bool,
    /// Iterations performed.
    pub iterations: usize,
}

/// Normalized degree centrality: (in + out degree) / (V - 1).
pub fn degree_centrality(snapshot: &GraphSnapshot) -> HashMap<AssetId, f64> {
    let n = snapshot.node_count();
    let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };

    snapshot
        .sorted_node_ids()
        .into_iter()
        .map(|id| {
            let degree = snapshot.degree(&id) as f64;
            (id, if n > 1 { degree / denom } else { 0.0 })
        })
        .collect()
}

/// BFS distances from `start` along outgoing edges.
fn bfs_distances(snapshot: &GraphSnapshot, start: &str) -> HashMap<AssetId, usize> {
    let mut dist: HashMap<AssetId, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    dist.insert(start.to_string(), 0);
    queue.push_back(start.to_string());

    while let Some(current) = queue.pop_front() {
        let d = dist[&current];
        for edge in snapshot.outgoing_edges(&current) {
            if !dist.contains_key(&edge.target_id) {
                dist.insert(edge.target_id.clone(), d + 1);
                queue.push_back(edge.target_id.clone());
            }
        }
    }
    dist
}

/// Closeness centrality, Wasserman-Faust generalization:
/// `(r / (n - 1)) * (r / sum_of_distances)` where `r` is the number of
/// nodes reachable from the node and `n` its weak component size. Nodes
/// that reach nothing score 0.
pub fn closeness_centrality(snapshot: &GraphSnapshot) -> HashMap<AssetId, f64> {
    let components = weak_components(snapshot);
    let mut component_size: HashMap<AssetId, usize> = HashMap::new();
    for component in &components {
        for id in component {
            component_size.insert(id.clone(), component.len());
        }
    }

    let mut result = HashMap::new();
    for id in snapshot.sorted_node_ids() {
        let n = component_size.get(&id).copied().unwrap_or(1);
        if n <= 1 {
            result.insert(id, 0.0);
            continue;
        }

        let dist = bfs_distances(snapshot, &id);
        let r = dist.len() - 1;
        let total: usize = dist.values().sum();
        let score = if r > 0 && total > 0 {
            let r = r as f64;
            (r / (n - 1) as f64) * (r / total as f64)
        } else {
            0.0
        };
        result.insert(id, score);
    }
    result
}

/// Betweenness centrality via Brandes' algorithm on the directed graph,
/// normalized per weak component by `(n - 1)(n - 2)`.
pub fn betweenness_centrality(snapshot: &GraphSnapshot) -> HashMap<AssetId, f64> {
    let ids = snapshot.sorted_node_ids();
    let mut betweenness: HashMap<AssetId, f64> = ids.iter().cloned().map(|id| (id, 0.0)).collect();

    for source in &ids {
        // Brandes single-source accumulation.
        let mut stack: Vec<AssetId> = Vec::new();
        let mut preds: HashMap<AssetId, Vec<AssetId>> = HashMap::new();
        let mut sigma: HashMap<AssetId, f64> = HashMap::new();
        let mut dist: HashMap<AssetId, i64> = HashMap::new();

        sigma.insert(source.clone(), 1.0);
        dist.insert(source.clone(), 0);

        let mut queue = VecDeque::new();
        queue.push_back(source.clone());

        while let Some(v) = queue.pop_front() {
            stack.push(v.clone());
            let dv = dist[&v];
            let sv = sigma[&v];
            for edge in snapshot.outgoing_edges(&v) {
                let w = &edge.target_id;
                if !dist.contains_key(w.as_str()) {
                    dist.insert(w.clone(), dv + 1);
                    queue.push_back(w.clone());
                }
                if dist[w.as_str()] == dv + 1 {
                    *sigma.entry(w.clone()).or_insert(0.0) += sv;
                    preds.entry(w.clone()).or_default().push(v.clone());
                }
            }
        }

        let mut delta: HashMap<AssetId, f64> = HashMap::new();
        while let Some(w) = stack.pop() {
            let dw = delta.get(&w).copied().unwrap_or(0.0);
            if let Some(pred_list) = preds.get(&w) {
                for v in pred_list {
                    let contribution = (sigma[v] / sigma[&w]) * (1.0 + dw);
                    *delta.entry(v.clone()).or_insert(0.0) += contribution;
                }
            }
            if &w != source {
                *betweenness.get_mut(&w).expect("known node") += dw;
            }
        }
    }

    // Normalize per weak component.
    let components = weak_components(snapshot);
    for component in &components {
        let n = component.len();
        if n > 2 {
            let denom = ((n - 1) * (n - 2)) as f64;
            for id in component {
                if let Some(score) = betweenness.get_mut(id) {
                    *score /= denom;
                }
            }
        }
    }
    betweenness
}

/// Eigenvector centrality via power iteration on the (possibly asymmetric)
/// adjacency matrix. A node's score accumulates from its in-neighbors.
/// Converges when the L2-norm change drops below 1e-6 or after 1000
/// iterations; on non-convergence the last iterate is returned flagged.
pub fn eigenvector_centrality(snapshot: &GraphSnapshot) -> EigenvectorResult {
    let ids = snapshot.sorted_node_ids();
    let n = ids.len();
    if n == 0 {
        return EigenvectorResult {
            scores: HashMap::new(),
            converged: true,
            iterations: 0,
        };
    }

    let initial = 1.0 / (n as f64).sqrt();
    let mut current: HashMap<AssetId, f64> =
        ids.iter().cloned().map(|id| (id, initial)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < EIGENVECTOR_MAX_ITERATIONS {
        iterations += 1;

        let mut next: HashMap<AssetId, f64> = ids.iter().cloned().map(|id| (id, 0.0)).collect();
        for id in &ids {
            let mut sum = 0.0;
            for edge in snapshot.incoming_edges(id) {
                sum += current.get(&edge.source_id).copied().unwrap_or(0.0);
            }
            next.insert(id.clone(), sum);
        }

        let norm: f64 = next.values().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            // No edges contribute; the zero vector is a fixed point.
            current = next;
            converged = true;
            break;
        }
        for value in next.values_mut() {
            *value /= norm;
        }

        let diff: f64 = ids
            .iter()
            .map(|id| {
                let delta = next[id] - current[id];
                delta * delta
            })
            .sum::<f64>()
            .sqrt();

        current = next;
        if diff < EIGENVECTOR_EPSILON {
            converged = true;
            break;
        }
    }

    EigenvectorResult {
        scores: current,
        converged,
        iterations,
    }
}
