//! Trellis - a data-lineage impact-analysis engine.
//!
//! Trellis models catalog assets and their transformation relationships as
//! a directed graph, computes structural metrics over that graph, and
//! propagates the effect of a proposed change (schema edit, deletion,
//! permission change) through the graph to produce a ranked, scored list of
//! affected assets plus derived risk, cost, and ROI figures.
//!
//! # Features
//!
//! - **Graph Store**: Canonical node/edge collections with referential
//!   integrity and copy-on-read snapshots.
//! - **Traversal**: Bounded, directional, cycle-safe BFS with deterministic
//!   ordering.
//! - **Metrics**: Degree/closeness/betweenness/eigenvector centrality,
//!   clustering, and longest-path analysis over SCC condensation.
//! - **Impact Scoring**: Weighted factors with per-hop decay, dimension
//!   scores, and rule-table recommendations.
//! - **Cost/ROI**: Configurable linear cost functions with explicit
//!   currencies.
//! - **Jobs**: Cancellable, progress-reporting analysis jobs over immutable
//!   snapshots.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Trellis                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Job Manager: submit | poll | cancel | events               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Analysis: Traversal | Metrics | Scoring | Cost/ROI         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Graph Store: nodes | edges | versioned snapshots           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trellis::graph::{AssetKind, AssetNode, EdgeKind, GraphStore, LineageEdge};
//! use trellis::impact::ChangeType;
//! use trellis::jobs::{AnalysisJobManager, AnalysisRequest};
//!
//! #[tokio::main]
//! async fn main() -> trellis::Result<()> {
//!     let store = Arc::new(GraphStore::new());
//!     store.add_node(AssetNode::new("orders", AssetKind::Table, "Orders")).await?;
//!     store.add_node(AssetNode::new("revenue", AssetKind::Dashboard, "Revenue")).await?;
//!     store.add_edge(LineageEdge::new("orders", "revenue", EdgeKind::Aggregation)).await?;
//!
//!     let manager = AnalysisJobManager::new(store);
//!     let job_id = manager
//!         .submit(AnalysisRequest::new("orders", ChangeType::TableRemoval))
//!         .await?;
//!     let status = manager.poll(&job_id).await?;
//!     println!("job {} is {:?}", job_id, status.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod graph;
pub mod impact;
pub mod jobs;
pub mod metrics;

pub use config::TrellisConfig;
pub use error::{Result, TrellisError};

/// Current version of Trellis.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
