//! Lineage graph: asset/relationship model, live store, snapshots, and
//! bounded traversal.
//!
//! - The [`GraphStore`] owns the canonical node/edge collections and
//!   enforces referential integrity.
//! - A [`GraphSnapshot`] is an immutable point-in-time view; every analysis
//!   computation runs against a snapshot, never the live store.
//! - [`traverse`] performs level-synchronous BFS with direction, depth, and
//!   kind filters.

pub mod model;
pub mod snapshot;
pub mod store;
pub mod traverse;

pub use model::{AssetKind, AssetNode, AssetStatus, EdgeKind, LineageEdge, QualityScore};
pub use snapshot::GraphSnapshot;
pub use store::GraphStore;
pub use traverse::{
    shortest_path, traverse, traverse_cancellable, Direction, ReachedFrom, TraversalEntry,
    TraversalOptions, TraversalResult,
};
