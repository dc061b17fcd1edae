//! Impact and risk analysis over traversal results.
//!
//! Turns a traversal into a ranked set of per-asset impact records plus
//! dimension scores, recommendations, and cost/ROI figures:
//! - Scoring: weighted factors with per-hop decay ([`scoring`])
//! - Recommendations: rule table keyed by level and change type
//!   ([`recommend`])
//! - Cost/ROI: configurable linear estimators ([`cost`])

pub mod cost;
pub mod recommend;
pub mod scoring;

pub use cost::{
    CostBreakdown, CostConfig, CostEstimate, CostEstimator, Money, RiskUnitCosts, RoiProjection,
};
pub use recommend::recommendations_for;
pub use scoring::{
    score_impact, DimensionFormula, DimensionFormulas, FactorWeights, ScoringConfig, ScoringEngine,
};

use crate::types::AssetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of change being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Schema edit (column added/renamed)
    SchemaChange,
    /// Column data type change
    DataTypeChange,
    /// Column removal
    ColumnRemoval,
    /// Whole-table removal
    TableRemoval,
    /// Permission or grant change
    PermissionChange,
    /// Physical location change
    LocationChange,
}

impl ChangeType {
    /// All change types, for exhaustive table coverage in tests.
    pub const ALL: [ChangeType; 6] = [
        ChangeType::SchemaChange,
        ChangeType::DataTypeChange,
        ChangeType::ColumnRemoval,
        ChangeType::TableRemoval,
        ChangeType::PermissionChange,
        ChangeType::LocationChange,
    ];

    /// Whether the change destroys data or structure outright.
    pub fn is_destructive(&self) -> bool {
        matches!(self, ChangeType::ColumnRemoval | ChangeType::TableRemoval)
    }
}

/// Categorical impact level, derived from the numeric score via fixed
/// thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    /// Maps a score to a level. Thresholds are exact for reproducibility:
    /// `>= 0.9` critical, `>= 0.7` high, `>= 0.4` medium, `>= floor` low,
    /// below the floor minimal.
    pub fn from_score(score: f64, minimal_floor: f64) -> Self {
        if score >= 0.9 {
            ImpactLevel::Critical
        } else if score >= 0.7 {
            ImpactLevel::High
        } else if score >= 0.4 {
            ImpactLevel::Medium
        } else if score >= minimal_floor {
            ImpactLevel::Low
        } else {
            ImpactLevel::Minimal
        }
    }

    /// All levels, for exhaustive table coverage in tests.
    pub const ALL: [ImpactLevel; 5] = [
        ImpactLevel::Minimal,
        ImpactLevel::Low,
        ImpactLevel::Medium,
        ImpactLevel::High,
        ImpactLevel::Critical,
    ];
}

/// How the impact reaches an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactType {
    /// One hop from the changed asset.
    Direct,
    /// Two to three hops away.
    Indirect,
    /// Four or more hops away.
    Cascading,
}

impl ImpactType {
    /// Classifies by shortest-path depth from the change source.
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 | 1 => ImpactType::Direct,
            2 | 3 => ImpactType::Indirect,
            _ => ImpactType::Cascading,
        }
    }
}

/// Per-asset impact record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactRecord {
    /// Affected asset id.
    pub asset_id: AssetId,
    /// Categorical level.
    pub impact_level: ImpactLevel,
    /// Direct / indirect / cascading.
    pub impact_type: ImpactType,
    /// Impact score in [0,1].
    pub impact_score: f64,
    /// Confidence in [0,1]: product of edge confidences along the path.
    pub confidence: f64,
    /// Estimated remediation effort in hours.
    pub estimated_effort_hours: f64,
    /// Textual risk factors.
    pub risk_factors: Vec<String>,
    /// Asset ids on the propagation path, source first.
    pub dependencies: Vec<AssetId>,
    /// Shortest hop count from the change source.
    pub depth: usize,
}

/// Aggregated per-dimension scores, each in [0,1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    pub business: f64,
    pub technical: f64,
    pub operational: f64,
    pub compliance: f64,
}

/// Full result of one impact analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAnalysisResult {
    /// The asset whose change was analyzed.
    pub source_asset_id: AssetId,
    /// The analyzed change.
    pub change_type: ChangeType,
    /// Ranked impact records, most severe first.
    pub records: Vec<ImpactRecord>,
    /// Blended overall score in [0,1]; 0 for an empty affected set.
    pub overall_impact_score: f64,
    /// Dimension scores.
    pub dimensions: DimensionScores,
    /// Recommendations from the rule table.
    pub recommendations: Vec<String>,
    /// Cost and ROI figures, when estimated.
    pub cost: Option<CostEstimate>,
    /// Non-fatal degradations (truncated traversal, non-convergence).
    pub warnings: Vec<String>,
    /// When the analysis ran.
    pub analyzed_at: DateTime<Utc>,
    /// Store version of the snapshot analyzed.
    pub snapshot_version: u64,
}

impl ImpactAnalysisResult {
    /// Highest level among the records, if any.
    pub fn max_level(&self) -> Option<ImpactLevel> {
        self.records.iter().map(|r| r.impact_level).max()
    }

    /// Number of affected assets.
    pub fn affected_count(&self) -> usize {
        self.records.len()
    }
}
