//! Impact scoring: weighted factors, path decay, and dimension aggregation.
//!
//! Scoring policy lives here as explicit configuration rather than constants
//! scattered through callers: factor weights, the per-hop decay, the minimal
//! floor, and the dimension formulas are all fields of [`ScoringConfig`] and
//! can be overridden per deployment. Level thresholds are fixed (see
//! [`ImpactLevel::from_score`]) so results stay reproducible.

use super::{
    recommendations_for, ChangeType, DimensionScores, ImpactAnalysisResult, ImpactLevel,
    ImpactRecord, ImpactType,
};
use crate::error::{Result, TrellisError};
use crate::graph::{GraphSnapshot, TraversalEntry, TraversalResult};
use crate::types::AssetId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tolerance when validating that factor weights sum to 1.0.
const WEIGHT_EPSILON: f64 = 1e-6;

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Weights of the three scoring factors. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FactorWeights {
    /// Weight of downstream-dependency density.
    pub dependency_density: f64,
    /// Weight of business criticality.
    pub business_criticality: f64,
    /// Weight of technical complexity.
    pub technical_complexity: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            dependency_density: 0.4,
            business_criticality: 0.35,
            technical_complexity: 0.25,
        }
    }
}

impl FactorWeights {
    /// Validates that the weights sum to 1.0 within tolerance.
    pub fn validate(&self) -> Result<()> {
        let sum = self.dependency_density + self.business_criticality + self.technical_complexity;
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(TrellisError::InvalidWeights { sum });
        }
        Ok(())
    }
}

/// Linear combination of the three factors used by one dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimensionFormula {
    pub dependency_density: f64,
    pub business_criticality: f64,
    pub technical_complexity: f64,
}

impl DimensionFormula {
    fn apply(&self, factors: &Factors) -> f64 {
        self.dependency_density * factors.density
            + self.business_criticality * factors.criticality
            + self.technical_complexity * factors.complexity
    }
}

/// Per-dimension formulas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimensionFormulas {
    pub business: DimensionFormula,
    pub technical: DimensionFormula,
    pub operational: DimensionFormula,
    pub compliance: DimensionFormula,
}

impl Default for DimensionFormulas {
    fn default() -> Self {
        Self {
            business: DimensionFormula {
                dependency_density: 0.2,
                business_criticality: 0.7,
                technical_complexity: 0.1,
            },
            technical: DimensionFormula {
                dependency_density: 0.3,
                business_criticality: 0.1,
                technical_complexity: 0.6,
            },
            operational: DimensionFormula {
                dependency_density: 0.5,
                business_criticality: 0.2,
                technical_complexity: 0.3,
            },
            compliance: DimensionFormula {
                dependency_density: 0.1,
                business_criticality: 0.6,
                technical_complexity: 0.3,
            },
        }
    }
}

/// Scoring configuration. Dimension multipliers and the recommendation
/// table are deployment policy: the values here are defaults, not fixed
/// requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Factor weights; must sum to 1.0.
    pub weights: FactorWeights,
    /// Per-hop decay factor d: an asset N hops away is damped by d^N.
    pub decay: f64,
    /// Scores below this floor map to `minimal`.
    pub minimal_floor: f64,
    /// Scale for deriving effort hours from score and complexity.
    pub effort_scale_hours: f64,
    /// Dimension formulas.
    pub dimensions: DimensionFormulas,
    /// Change-type-specific dimension multipliers.
    pub change_multipliers: HashMap<ChangeType, DimensionScores>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let mut change_multipliers = HashMap::new();
        change_multipliers.insert(
            ChangeType::SchemaChange,
            DimensionScores { business: 1.0, technical: 1.1, operational: 1.0, compliance: 0.9 },
        );
        change_multipliers.insert(
            ChangeType::DataTypeChange,
            DimensionScores { business: 0.9, technical: 1.2, operational: 1.0, compliance: 0.9 },
        );
        change_multipliers.insert(
            ChangeType::ColumnRemoval,
            DimensionScores { business: 1.1, technical: 1.1, operational: 1.1, compliance: 1.1 },
        );
        change_multipliers.insert(
            ChangeType::TableRemoval,
            DimensionScores { business: 1.2, technical: 1.0, operational: 1.3, compliance: 1.25 },
        );
        change_multipliers.insert(
            ChangeType::PermissionChange,
            DimensionScores { business: 0.8, technical: 0.7, operational: 0.9, compliance: 1.3 },
        );
        change_multipliers.insert(
            ChangeType::LocationChange,
            DimensionScores { business: 0.7, technical: 1.0, operational: 1.2, compliance: 1.0 },
        );

        Self {
            weights: FactorWeights::default(),
            decay: 0.85,
            minimal_floor: 0.1,
            effort_scale_hours: 40.0,
            dimensions: DimensionFormulas::default(),
            change_multipliers,
        }
    }
}

impl ScoringConfig {
    /// Validates ranges and weight sums.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.decay) {
            return Err(TrellisError::InvalidConfig {
                field: "scoring.decay".to_string(),
                reason: format!("must be in [0,1], got {}", self.decay),
            });
        }
        if !(0.0..0.4).contains(&self.minimal_floor) {
            return Err(TrellisError::InvalidConfig {
                field: "scoring.minimal_floor".to_string(),
                reason: format!("must be in [0,0.4), got {}", self.minimal_floor),
            });
        }
        if self.effort_scale_hours < 0.0 {
            return Err(TrellisError::InvalidConfig {
                field: "scoring.effort_scale_hours".to_string(),
                reason: "must be >= 0".to_string(),
            });
        }
        Ok(())
    }

    fn multiplier_for(&self, change_type: ChangeType) -> DimensionScores {
        self.change_multipliers
            .get(&change_type)
            .copied()
            .unwrap_or(DimensionScores {
                business: 1.0,
                technical: 1.0,
                operational: 1.0,
                compliance: 1.0,
            })
    }
}

/// Raw factor values for one asset, each in [0,1].
struct Factors {
    density: f64,
    criticality: f64,
    complexity: f64,
}

/// Impact and risk scoring engine.
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    /// Creates an engine with the given configuration.
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Scores a traversal result for the given change.
    ///
    /// `weights_override` replaces the configured factor weights for this
    /// run; it must sum to 1.0 or the call fails with `InvalidWeights`.
    /// Fails with `EmptyTraversal` only when the traversal contains no
    /// entries at all: a traversal that visited just the source is a valid
    /// zero-impact analysis.
    pub fn score(
        &self,
        snapshot: &GraphSnapshot,
        traversal: &TraversalResult,
        change_type: ChangeType,
        weights_override: Option<FactorWeights>,
    ) -> Result<ImpactAnalysisResult> {
        let weights = weights_override.unwrap_or(self.config.weights);
        weights.validate()?;

        if traversal.visited.is_empty() {
            return Err(TrellisError::EmptyTraversal(format!(
                "traversal from {} produced no entries",
                traversal.start_id
            )));
        }

        let max_importance = snapshot
            .nodes()
            .map(|n| n.importance)
            .fold(0.0_f64, f64::max);
        let node_count = snapshot.node_count();

        let mut warnings = Vec::new();
        if traversal.truncated {
            warnings.push(format!(
                "traversal from {} was truncated by the depth bound; scores cover reached assets only",
                traversal.start_id
            ));
        }

        // criticality used by the ranking tie-break, keyed by asset id
        let mut criticality: HashMap<AssetId, f64> = HashMap::new();
        let mut records: Vec<ImpactRecord> = Vec::new();
        let mut factor_rows: Vec<Factors> = Vec::new();

        for entry in traversal.affected() {
            let factors = self.factors(snapshot, entry, max_importance, node_count);

            let base = weights.dependency_density * factors.density
                + weights.business_criticality * factors.criticality
                + weights.technical_complexity * factors.complexity;

            let (path_strength, path_confidence) = path_weight(snapshot, entry);
            let decayed = base * path_strength * self.config.decay.powi(entry.depth as i32);
            let impact_score = clamp01(decayed);

            let level = ImpactLevel::from_score(impact_score, self.config.minimal_floor);
            let effort = impact_score * factors.complexity * self.config.effort_scale_hours;

            criticality.insert(entry.node.id.clone(), factors.criticality);
            records.push(ImpactRecord {
                asset_id: entry.node.id.clone(),
                impact_level: level,
                impact_type: ImpactType::from_depth(entry.depth),
                impact_score,
                confidence: path_confidence,
                estimated_effort_hours: effort,
                risk_factors: risk_factors(entry, &factors, path_confidence, change_type),
                dependencies: dependency_path(snapshot, &traversal.start_id, entry),
                depth: entry.depth,
            });
            factor_rows.push(factors);
        }

        // Rank: score desc, then shorter path, then higher criticality,
        // then lexicographic id.
        records.sort_by(|a, b| {
            b.impact_score
                .partial_cmp(&a.impact_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.depth.cmp(&b.depth))
                .then_with(|| {
                    let ca = criticality.get(&a.asset_id).copied().unwrap_or(0.0);
                    let cb = criticality.get(&b.asset_id).copied().unwrap_or(0.0);
                    cb.partial_cmp(&ca).unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.asset_id.cmp(&b.asset_id))
        });

        let overall = overall_score(&records);
        let dimensions = self.dimension_scores(&factor_rows, change_type);

        let recommendations = match records.first() {
            Some(top) => recommendations_for(top.impact_level, change_type),
            None => vec![
                "No dependent assets were reached; the change is isolated".to_string(),
            ],
        };

        Ok(ImpactAnalysisResult {
            source_asset_id: traversal.start_id.clone(),
            change_type,
            records,
            overall_impact_score: overall,
            dimensions,
            recommendations,
            cost: None,
            warnings,
            analyzed_at: Utc::now(),
            snapshot_version: snapshot.version(),
        })
    }

    fn factors(
        &self,
        snapshot: &GraphSnapshot,
        entry: &TraversalEntry,
        max_importance: f64,
        node_count: usize,
    ) -> Factors {
        let density = if node_count > 1 {
            snapshot.degree(&entry.node.id) as f64 / (node_count - 1) as f64
        } else {
            0.0
        };
        let criticality = if max_importance > 0.0 {
            clamp01(entry.node.importance / max_importance)
        } else {
            0.0
        };
        Factors {
            density: clamp01(density),
            criticality,
            complexity: entry.node.kind.complexity(),
        }
    }

    fn dimension_scores(&self, rows: &[Factors], change_type: ChangeType) -> DimensionScores {
        if rows.is_empty() {
            return DimensionScores::default();
        }
        let n = rows.len() as f64;
        let formulas = &self.config.dimensions;
        let multiplier = self.config.multiplier_for(change_type);

        let mean = |f: &DimensionFormula| rows.iter().map(|r| f.apply(r)).sum::<f64>() / n;

        DimensionScores {
            business: clamp01(mean(&formulas.business) * multiplier.business),
            technical: clamp01(mean(&formulas.technical) * multiplier.technical),
            operational: clamp01(mean(&formulas.operational) * multiplier.operational),
            compliance: clamp01(mean(&formulas.compliance) * multiplier.compliance),
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Scores with default configuration.
pub fn score_impact(
    snapshot: &GraphSnapshot,
    traversal: &TraversalResult,
    change_type: ChangeType,
) -> Result<ImpactAnalysisResult> {
    ScoringEngine::default().score(snapshot, traversal, change_type, None)
}

/// Cumulative (strength product, confidence product) along an entry's path.
fn path_weight(snapshot: &GraphSnapshot, entry: &TraversalEntry) -> (f64, f64) {
    let mut strength = 1.0;
    let mut confidence = 1.0;
    for edge_id in &entry.path_edges {
        if let Some(edge) = snapshot.edge(edge_id) {
            strength *= edge.strength;
            confidence *= edge.confidence;
        }
    }
    (strength, clamp01(confidence))
}

/// Asset ids along the propagation path, source first, target last.
fn dependency_path(
    snapshot: &GraphSnapshot,
    start_id: &str,
    entry: &TraversalEntry,
) -> Vec<AssetId> {
    let mut path = vec![start_id.to_string()];
    let mut current = start_id.to_string();
    for edge_id in &entry.path_edges {
        if let Some(edge) = snapshot.edge(edge_id) {
            // Direction-agnostic walk: step to whichever endpoint is new.
            let next = if edge.source_id == current {
                edge.target_id.clone()
            } else {
                edge.source_id.clone()
            };
            path.push(next.clone());
            current = next;
        }
    }
    path
}

fn risk_factors(
    entry: &TraversalEntry,
    factors: &Factors,
    path_confidence: f64,
    change_type: ChangeType,
) -> Vec<String> {
    use crate::graph::AssetStatus;

    let mut out = Vec::new();
    if change_type.is_destructive() {
        out.push("upstream change is destructive".to_string());
    }
    if entry.node.status == AssetStatus::Deprecated {
        out.push("asset is deprecated".to_string());
    }
    if factors.density > 0.5 {
        out.push("asset has many direct dependents".to_string());
    }
    if let Some(quality) = &entry.node.quality {
        if quality.overall < 0.5 {
            out.push("asset quality score is low".to_string());
        }
    }
    if path_confidence < 0.5 {
        out.push("lineage path has low discovery confidence".to_string());
    }
    out
}

/// Blend of max and mean asset scores; zero for an empty affected set.
fn overall_score(records: &[ImpactRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let max = records
        .iter()
        .map(|r| r.impact_score)
        .fold(0.0_f64, f64::max);
    let mean = records.iter().map(|r| r.impact_score).sum::<f64>() / records.len() as f64;
    clamp01(0.7 * max + 0.3 * mean)
}
