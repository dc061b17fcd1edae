// Asset and relationship model for the lineage graph

use crate::types::{now_millis, AssetId, EdgeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Asset kind tracked in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Database table
    Table,
    /// Database view
    View,
    /// Stored procedure
    StoredProcedure,
    /// SQL or UDF function
    Function,
    /// Dataset
    Dataset,
    /// Report
    Report,
    /// Dashboard
    Dashboard,
    /// ML model
    Model,
    /// API endpoint
    Api,
    /// File
    File,
    /// Streaming topic
    Stream,
    /// Message queue
    Queue,
}

impl AssetKind {
    /// Baseline technical complexity of changing an asset of this kind,
    /// in [0,1]. Used as a scoring factor.
    pub fn complexity(&self) -> f64 {
        match self {
            AssetKind::Table => 0.5,
            AssetKind::View => 0.4,
            AssetKind::StoredProcedure => 0.9,
            AssetKind::Function => 0.7,
            AssetKind::Dataset => 0.5,
            AssetKind::Report => 0.3,
            AssetKind::Dashboard => 0.3,
            AssetKind::Model => 0.8,
            AssetKind::Api => 0.6,
            AssetKind::File => 0.2,
            AssetKind::Stream => 0.7,
            AssetKind::Queue => 0.6,
        }
    }
}

/// Asset status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    /// Active and available
    Active,
    /// Inactive (not currently refreshed)
    Inactive,
    /// Deprecated but available
    Deprecated,
}

/// Structured quality score attached to an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityScore {
    /// Overall score (0-1)
    pub overall: f64,
    /// Completeness (0-1)
    pub completeness: f64,
    /// Accuracy (0-1)
    pub accuracy: f64,
    /// Freshness (0-1)
    pub freshness: f64,
}

/// Asset node in the lineage graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetNode {
    /// Unique asset ID
    pub id: AssetId,
    /// Display name
    pub name: String,
    /// Asset kind
    pub kind: AssetKind,
    /// Business importance weight (>= 0, default 1)
    pub importance: f64,
    /// Tags
    pub tags: BTreeSet<String>,
    /// Quality score, if assessed
    pub quality: Option<QualityScore>,
    /// Status
    pub status: AssetStatus,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
}

impl AssetNode {
    /// Creates a new active asset node with default importance.
    pub fn new(id: impl Into<AssetId>, kind: AssetKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            importance: 1.0,
            tags: BTreeSet::new(),
            quality: None,
            status: AssetStatus::Active,
            created_at: now_millis(),
        }
    }

    /// Sets importance
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    /// Adds a tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    /// Sets quality score
    pub fn with_quality(mut self, quality: QualityScore) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Sets status
    pub fn with_status(mut self, status: AssetStatus) -> Self {
        self.status = status;
        self
    }
}

/// Relationship kind between two assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Direct copy or reference
    Direct,
    /// General transformation
    Transformation,
    /// Aggregation
    Aggregation,
    /// Join
    Join,
    /// Union
    Union,
    /// Filter
    Filter,
    /// Sort
    Sort,
    /// Group-by
    GroupBy,
    /// Pivot
    Pivot,
    /// Unpivot
    Unpivot,
    /// Window function
    WindowFunction,
    /// Subquery
    Subquery,
}

/// Lineage edge: `source_id` contributes to `target_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEdge {
    /// Edge ID
    pub id: EdgeId,
    /// Source asset ID
    pub source_id: AssetId,
    /// Target asset ID
    pub target_id: AssetId,
    /// Relationship kind
    pub kind: EdgeKind,
    /// Propagation weight (>= 0)
    pub strength: f64,
    /// Discovery confidence (0-1)
    pub confidence: f64,
    /// Whether a self-loop represents an intentional recursive
    /// transformation. Unflagged self-loops are rejected at insert time.
    pub recursive: bool,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
}

impl LineageEdge {
    /// Creates a new edge with full strength and confidence.
    pub fn new(source_id: &str, target_id: &str, kind: EdgeKind) -> Self {
        let id = format!("{}->{}", source_id, target_id);
        Self {
            id,
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            kind,
            strength: 1.0,
            confidence: 1.0,
            recursive: false,
            created_at: now_millis(),
        }
    }

    /// Sets an explicit edge ID
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Sets strength
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    /// Sets confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Flags the edge as a recursive self-transformation
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Whether the edge is a self-loop.
    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }
}
