//! Structural measures: clustering, connectivity, and longest paths.
//!
//! Longest-path analysis must terminate on cyclic input, so it runs over the
//! condensation of the graph (strongly-connected components collapsed to
//! single nodes). On a cyclic graph the reported length is a lower bound and
//! the result carries `graph_has_cycles: true`.

use crate::graph::GraphSnapshot;
use crate::types::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Longest simple path estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongestPathResult {
    /// Path length in hops. Exact on acyclic graphs; a lower bound when
    /// `graph_has_cycles` is set.
    pub length: usize,
    /// Whether the graph contains at least one cycle.
    pub graph_has_cycles: bool,
}

/// Weakly-connected components, each a list of node ids. Deterministic:
/// components are discovered from lexicographically ordered roots.
pub fn weak_components(snapshot: &GraphSnapshot) -> Vec<Vec<AssetId>> {
    let mut assigned: HashSet<AssetId> = HashSet::new();
    let mut components = Vec::new();

    for root in snapshot.sorted_node_ids() {
        if assigned.contains(&root) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        assigned.insert(root.clone());
        queue.push_back(root);

        while let Some(current) = queue.pop_front() {
            component.push(current.clone());
            for neighbor in snapshot.undirected_neighbors(&current) {
                if assigned.insert(neighbor.clone()) {
                    queue.push_back(neighbor);
                }
            }
        }
        components.push(component);
    }
    components
}

/// Local clustering coefficient of one node: closed triplets over possible
/// triplets among its neighbors, treating the graph as undirected.
pub fn clustering_coefficient(snapshot: &GraphSnapshot, node_id: &str) -> f64 {
    let neighbors = snapshot.undirected_neighbors(node_id);
    let k = neighbors.len();
    if k < 2 {
        return 0.0;
    }

    let mut links = 0usize;
    for i in 0..k {
        for j in (i + 1)..k {
            if snapshot.connected_undirected(&neighbors[i], &neighbors[j]) {
                links += 1;
            }
        }
    }
    (2 * links) as f64 / (k * (k - 1)) as f64
}

/// Clustering coefficient for every node.
pub fn clustering_coefficients(snapshot: &GraphSnapshot) -> HashMap<AssetId, f64> {
    snapshot
        .sorted_node_ids()
        .into_iter()
        .map(|id| {
            let c = clustering_coefficient(snapshot, &id);
            (id, c)
        })
        .collect()
}

/// Strongly-connected components via iterative Tarjan. Components are
/// emitted sinks-first (reverse topological order of the condensation).
pub fn strongly_connected_components(snapshot: &GraphSnapshot) -> Vec<Vec<AssetId>> {
    let ids = snapshot.sorted_node_ids();
    let mut successors: HashMap<AssetId, Vec<AssetId>> = HashMap::new();
    for id in &ids {
        successors.insert(
            id.clone(),
            snapshot.outgoing_edges(id).map(|e| e.target_id.clone()).collect(),
        );
    }

    let mut next_index = 0usize;
    let mut indices: HashMap<AssetId, usize> = HashMap::new();
    let mut lowlink: HashMap<AssetId, usize> = HashMap::new();
    let mut on_stack: HashSet<AssetId> = HashSet::new();
    let mut stack: Vec<AssetId> = Vec::new();
    let mut components: Vec<Vec<AssetId>> = Vec::new();

    for root in &ids {
        if indices.contains_key(root) {
            continue;
        }

        // Explicit DFS work stack: (node, next successor position).
        let mut work: Vec<(AssetId, usize)> = vec![(root.clone(), 0)];
        while let Some((v, pos)) = work.pop() {
            if pos == 0 {
                indices.insert(v.clone(), next_index);
                lowlink.insert(v.clone(), next_index);
                next_index += 1;
                stack.push(v.clone());
                on_stack.insert(v.clone());
            }

            let succ = &successors[&v];
            if pos < succ.len() {
                let w = succ[pos].clone();
                work.push((v.clone(), pos + 1));
                if !indices.contains_key(&w) {
                    work.push((w, 0));
                } else if on_stack.contains(&w) {
                    let candidate = indices[&w];
                    if candidate < lowlink[&v] {
                        lowlink.insert(v, candidate);
                    }
                }
            } else {
                if lowlink[&v] == indices[&v] {
                    let mut component = Vec::new();
                    loop {
                        let w = stack.pop().expect("tarjan stack invariant");
                        on_stack.remove(&w);
                        let done = w == v;
                        component.push(w);
                        if done {
                            break;
                        }
                    }
                    components.push(component);
                }
                if let Some((parent, _)) = work.last() {
                    let child_low = lowlink[&v];
                    if child_low < lowlink[parent.as_str()] {
                        lowlink.insert(parent.clone(), child_low);
                    }
                }
            }
        }
    }
    components
}

/// Longest path over the SCC condensation. On a DAG every component has
/// size one and the result is the exact longest simple path length; on a
/// cyclic graph each multi-node component contributes its full size to the
/// best path through it, which yields a lower bound.
pub fn longest_path(snapshot: &GraphSnapshot) -> LongestPathResult {
    if snapshot.node_count() == 0 {
        return LongestPathResult {
            length: 0,
            graph_has_cycles: false,
        };
    }

    let components = strongly_connected_components(snapshot);
    let mut component_of: HashMap<AssetId, usize> = HashMap::new();
    for (i, component) in components.iter().enumerate() {
        for id in component {
            component_of.insert(id.clone(), i);
        }
    }

    let has_self_loop = snapshot.edges().any(|e| e.is_self_loop());
    let graph_has_cycles =
        components.iter().any(|c| c.len() > 1) || has_self_loop;

    // Condensation successors, deduplicated.
    let mut condensed: Vec<HashSet<usize>> = vec![HashSet::new(); components.len()];
    for edge in snapshot.edges() {
        let from = component_of[&edge.source_id];
        let to = component_of[&edge.target_id];
        if from != to {
            condensed[from].insert(to);
        }
    }

    // Tarjan emits components sinks-first, so successors are always
    // finished before their predecessors: one pass in emission order is a
    // complete DP.
    let mut best: Vec<usize> = vec![0; components.len()];
    for i in 0..components.len() {
        let downstream = condensed[i].iter().map(|&s| best[s]).max().unwrap_or(0);
        best[i] = components[i].len() + downstream;
    }

    LongestPathResult {
        length: best.iter().max().copied().unwrap_or(1) - 1,
        graph_has_cycles,
    }
}
