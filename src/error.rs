//! Error types for the Trellis lineage analysis engine.
//!
//! This module provides a unified error type [`TrellisError`] for all engine
//! operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! Errors are organized into the following categories:
//!
//! - **Graph Store**: Mutation failures (duplicate ids, dangling references,
//!   invalid weights). The store is left unchanged on any failed mutation.
//! - **Traversal/Metrics**: Caller-side input errors such as an unknown
//!   start node; never retried automatically.
//! - **Scoring/Cost**: Invalid weight overrides and currency mixing.
//! - **Jobs**: Unknown job ids and internal analysis failures, which carry a
//!   structured cause rather than crossing the async boundary as a panic.
//!
//! # Example
//!
//! ```rust
//! use trellis::error::{Result, TrellisError};
//!
//! fn lookup(id: &str) -> Result<()> {
//!     if id.is_empty() {
//!         return Err(TrellisError::NodeNotFound("".into()));
//!     }
//!     Ok(())
//! }
//!
//! fn handle_error(err: &TrellisError) {
//!     if err.is_caller_error() {
//!         println!("Fix the request: {}", err);
//!     } else {
//!         println!("Engine failure: {}", err);
//!     }
//! }
//! ```

use thiserror::Error;

/// Main error type for Trellis operations.
#[derive(Error, Debug)]
pub enum TrellisError {
    // Graph store mutation errors
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Edge {edge_id} references missing node: {node_id}")]
    DanglingReference { edge_id: String, node_id: String },

    #[error("Invalid weight on {edge_id}: {reason}")]
    InvalidWeight { edge_id: String, reason: String },

    #[error("Self-loop on {0} must be flagged as recursive")]
    UnflaggedSelfLoop(String),

    #[error("Node {id} is referenced by {edge_count} edge(s)")]
    NodeInUse { id: String, edge_count: usize },

    // Traversal and metrics errors
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // Scoring errors
    #[error("Traversal result is empty: {0}")]
    EmptyTraversal(String),

    #[error("Factor weights must sum to 1.0, got {sum}")]
    InvalidWeights { sum: f64 },

    // Cost estimation errors
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    // Job errors
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Cancelled during {0}")]
    Cancelled(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Catch-all for failures inside a running analysis
    #[error("Internal analysis failure in {stage}: {source}")]
    InternalAnalysisFailure {
        stage: String,
        #[source]
        source: Box<TrellisError>,
    },
}

impl TrellisError {
    /// Check whether the error indicates bad caller input rather than an
    /// internal engine failure. Caller errors are surfaced directly and are
    /// never retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            TrellisError::DuplicateId(_)
                | TrellisError::DanglingReference { .. }
                | TrellisError::InvalidWeight { .. }
                | TrellisError::UnflaggedSelfLoop(_)
                | TrellisError::NodeInUse { .. }
                | TrellisError::NodeNotFound(_)
                | TrellisError::InvalidWeights { .. }
                | TrellisError::CurrencyMismatch { .. }
                | TrellisError::JobNotFound(_)
                | TrellisError::InvalidConfig { .. }
        )
    }

    /// Wrap an error as an internal analysis failure attributed to a
    /// pipeline stage. Used by the job manager so that polling callers get a
    /// structured cause chain instead of a dropped task.
    pub fn analysis_failure(stage: &str, source: TrellisError) -> Self {
        TrellisError::InternalAnalysisFailure {
            stage: stage.to_string(),
            source: Box::new(source),
        }
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(e: serde_json::Error) -> Self {
        TrellisError::Serialization(e.to_string())
    }
}

/// Result type alias for Trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;
