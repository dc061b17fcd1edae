//! Structural graph metrics for dashboards and scoring inputs.
//!
//! Provides centrality measures, clustering, connectivity, and longest-path
//! analysis over a [`GraphSnapshot`]:
//! - Degree, closeness, betweenness, and eigenvector centrality
//! - Local clustering coefficients
//! - Weak components and SCC condensation
//! - Longest path / diameter lower bound on cyclic graphs
//!
//! All metrics are pure functions of a snapshot; callers must recompute
//! after the store's version counter changes.

pub mod centrality;
pub mod structure;

pub use centrality::{
    betweenness_centrality, closeness_centrality, degree_centrality, eigenvector_centrality,
    EigenvectorResult,
};
pub use structure::{
    clustering_coefficient, clustering_coefficients, longest_path, strongly_connected_components,
    weak_components, LongestPathResult,
};

use crate::error::{Result, TrellisError};
use crate::graph::GraphSnapshot;
use crate::types::AssetId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Full metrics report over one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetrics {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of edges.
    pub edge_count: usize,
    /// Edge density: E / (V * (V - 1)).
    pub density: f64,
    /// Normalized degree centrality per node.
    pub degree_centrality: HashMap<AssetId, f64>,
    /// Closeness centrality per node.
    pub closeness_centrality: HashMap<AssetId, f64>,
    /// Betweenness centrality per node.
    pub betweenness_centrality: HashMap<AssetId, f64>,
    /// Eigenvector centrality with convergence flag.
    pub eigenvector: EigenvectorResult,
    /// Local clustering coefficient per node.
    pub clustering: HashMap<AssetId, f64>,
    /// Mean of local clustering coefficients.
    pub average_clustering: f64,
    /// Number of weakly-connected components.
    pub weak_component_count: usize,
    /// Longest path length (lower bound on cyclic graphs).
    pub longest_path: LongestPathResult,
    /// Store version of the snapshot the metrics were computed from.
    pub snapshot_version: u64,
}

/// Computes all metrics over a snapshot.
///
/// A cooperative cancellation flag is checked between metric computations,
/// never mid-computation, bounding cancellation latency to one metric.
pub fn compute_metrics(
    snapshot: &GraphSnapshot,
    cancel: Option<&AtomicBool>,
) -> Result<GraphMetrics> {
    let check = |stage: &str| -> Result<()> {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(TrellisError::Cancelled(stage.to_string()));
            }
        }
        Ok(())
    };

    let n = snapshot.node_count();
    let density = if n > 1 {
        snapshot.edge_count() as f64 / (n * (n - 1)) as f64
    } else {
        0.0
    };

    check("degree centrality")?;
    let degree = degree_centrality(snapshot);

    check("closeness centrality")?;
    let closeness = closeness_centrality(snapshot);

    check("betweenness centrality")?;
    let betweenness = betweenness_centrality(snapshot);

    check("eigenvector centrality")?;
    let eigenvector = eigenvector_centrality(snapshot);
    if !eigenvector.converged {
        warn!(
            iterations = eigenvector.iterations,
            "Eigenvector centrality did not converge; returning last iterate"
        );
    }

    check("clustering")?;
    let clustering = clustering_coefficients(snapshot);
    let average_clustering = if clustering.is_empty() {
        0.0
    } else {
        clustering.values().sum::<f64>() / clustering.len() as f64
    };

    check("longest path")?;
    let longest = longest_path(snapshot);
    let components = weak_components(snapshot);

    Ok(GraphMetrics {
        node_count: n,
        edge_count: snapshot.edge_count(),
        density,
        degree_centrality: degree,
        closeness_centrality: closeness,
        betweenness_centrality: betweenness,
        eigenvector,
        clustering,
        average_clustering,
        weak_component_count: components.len(),
        longest_path: longest,
        snapshot_version: snapshot.version(),
    })
}
