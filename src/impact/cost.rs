//! Cost and ROI estimation over a scored impact set.
//!
//! Every cost component is a configurable linear function of the affected
//! assets and their risk levels. All monetary outputs carry an explicit
//! currency code; mixing currencies across inputs fails with
//! `CurrencyMismatch`. A zero projected benefit yields a null ROI rather
//! than an error.

use super::{ImpactAnalysisResult, ImpactLevel, ImpactRecord};
use crate::error::{Result, TrellisError};
use crate::graph::{AssetKind, GraphSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A monetary amount with its currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in currency units.
    pub amount: f64,
    /// ISO 4217 currency code.
    pub currency: String,
}

impl Money {
    /// Creates an amount.
    pub fn new(amount: f64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
        }
    }
}

/// Cost estimator configuration. Each component is a linear function with
/// explicit coefficients; rates are per hour or per affected asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Currency every figure is expressed in.
    pub currency: String,
    /// Default hourly remediation rate.
    pub hourly_rate: f64,
    /// Hourly-rate overrides per asset kind. Currencies must match
    /// `currency` or estimation fails with `CurrencyMismatch`.
    pub hourly_rate_overrides: HashMap<AssetKind, Money>,
    /// Fixed indirect cost incurred by any non-empty impact set.
    pub indirect_base: f64,
    /// Indirect cost per affected asset.
    pub indirect_per_asset: f64,
    /// Opportunity cost per affected asset.
    pub opportunity_per_asset: f64,
    /// Additional opportunity cost per high or critical asset.
    pub opportunity_high_risk_bonus: f64,
    /// Risk cost per asset by impact level.
    pub risk_unit_costs: RiskUnitCosts,
    /// Fraction of avoided risk and opportunity cost counted as benefit.
    pub mitigation_factor: f64,
    /// ROI projection horizon in months.
    pub horizon_months: f64,
}

/// Per-level risk cost units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskUnitCosts {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
    pub minimal: f64,
}

impl RiskUnitCosts {
    fn for_level(&self, level: ImpactLevel) -> f64 {
        match level {
            ImpactLevel::Critical => self.critical,
            ImpactLevel::High => self.high,
            ImpactLevel::Medium => self.medium,
            ImpactLevel::Low => self.low,
            ImpactLevel::Minimal => self.minimal,
        }
    }
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            hourly_rate: 120.0,
            hourly_rate_overrides: HashMap::new(),
            indirect_base: 500.0,
            indirect_per_asset: 150.0,
            opportunity_per_asset: 300.0,
            opportunity_high_risk_bonus: 1200.0,
            risk_unit_costs: RiskUnitCosts {
                critical: 5000.0,
                high: 2000.0,
                medium: 750.0,
                low: 200.0,
                minimal: 50.0,
            },
            mitigation_factor: 0.8,
            horizon_months: 12.0,
        }
    }
}

impl CostConfig {
    /// Validates rates and that every override shares the configured
    /// currency.
    pub fn validate(&self) -> Result<()> {
        if self.currency.is_empty() {
            return Err(TrellisError::InvalidConfig {
                field: "cost.currency".to_string(),
                reason: "currency code must not be empty".to_string(),
            });
        }
        if self.hourly_rate < 0.0 {
            return Err(TrellisError::InvalidConfig {
                field: "cost.hourly_rate".to_string(),
                reason: "must be >= 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.mitigation_factor) {
            return Err(TrellisError::InvalidConfig {
                field: "cost.mitigation_factor".to_string(),
                reason: format!("must be in [0,1], got {}", self.mitigation_factor),
            });
        }
        if self.horizon_months <= 0.0 {
            return Err(TrellisError::InvalidConfig {
                field: "cost.horizon_months".to_string(),
                reason: "must be > 0".to_string(),
            });
        }
        for (kind, money) in &self.hourly_rate_overrides {
            if money.currency != self.currency {
                return Err(TrellisError::CurrencyMismatch {
                    expected: self.currency.clone(),
                    actual: format!("{} (override for {:?})", money.currency, kind),
                });
            }
        }
        Ok(())
    }

    fn hourly_rate_for(&self, kind: AssetKind) -> f64 {
        self.hourly_rate_overrides
            .get(&kind)
            .map(|m| m.amount)
            .unwrap_or(self.hourly_rate)
    }
}

/// Monetary cost breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Remediation labor: unit rate times effort hours, summed.
    pub direct_cost: f64,
    /// Coordination and review overhead.
    pub indirect_cost: f64,
    /// Delayed roadmap work while remediation happens.
    pub opportunity_cost: f64,
    /// Exposure priced by risk level.
    pub risk_cost: f64,
    /// Sum of all components.
    pub total: f64,
    /// Currency of every figure.
    pub currency: String,
}

/// Return-on-investment projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiProjection {
    /// Total investment (the cost breakdown total).
    pub investment: f64,
    /// Projected benefit over the horizon.
    pub projected_benefit: f64,
    /// Benefit minus investment.
    pub net_benefit: f64,
    /// `net_benefit / investment`; null when the projected benefit or the
    /// investment is zero.
    pub roi: Option<f64>,
    /// Months to recoup the investment; null when net benefit is not
    /// positive.
    pub payback_period_months: Option<f64>,
    /// Horizon the projection covers.
    pub horizon_months: f64,
    /// Currency of every figure.
    pub currency: String,
}

/// Cost breakdown plus ROI projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub breakdown: CostBreakdown,
    pub roi: RoiProjection,
}

/// Cost/ROI estimator.
#[derive(Debug)]
pub struct CostEstimator {
    config: CostConfig,
}

impl CostEstimator {
    /// Creates an estimator; fails if the configuration is invalid or
    /// mixes currencies.
    pub fn new(config: CostConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Estimates cost and ROI for a scored impact set. The snapshot
    /// supplies asset kinds for per-kind rate overrides.
    pub fn estimate(
        &self,
        snapshot: &GraphSnapshot,
        impact: &ImpactAnalysisResult,
    ) -> Result<CostEstimate> {
        let records = &impact.records;
        let n = records.len() as f64;

        let direct_cost: f64 = records
            .iter()
            .map(|r| self.rate_for_record(snapshot, r) * r.estimated_effort_hours)
            .sum();

        let indirect_cost = if records.is_empty() {
            0.0
        } else {
            self.config.indirect_base + self.config.indirect_per_asset * n
        };

        let high_risk = records
            .iter()
            .filter(|r| r.impact_level >= ImpactLevel::High)
            .count() as f64;
        let opportunity_cost =
            self.config.opportunity_per_asset * n + self.config.opportunity_high_risk_bonus * high_risk;

        let risk_cost: f64 = records
            .iter()
            .map(|r| self.config.risk_unit_costs.for_level(r.impact_level))
            .sum();

        let total = direct_cost + indirect_cost + opportunity_cost + risk_cost;

        // Benefit of acting on the analysis: the share of risk and
        // opportunity exposure the remediation removes.
        let projected_benefit = (risk_cost + opportunity_cost) * self.config.mitigation_factor;
        let net_benefit = projected_benefit - total;

        let roi = if projected_benefit == 0.0 || total == 0.0 {
            None
        } else {
            Some(net_benefit / total)
        };
        let payback_period_months = if net_benefit > 0.0 {
            Some(total / (net_benefit / self.config.horizon_months))
        } else {
            None
        };

        Ok(CostEstimate {
            breakdown: CostBreakdown {
                direct_cost,
                indirect_cost,
                opportunity_cost,
                risk_cost,
                total,
                currency: self.config.currency.clone(),
            },
            roi: RoiProjection {
                investment: total,
                projected_benefit,
                net_benefit,
                roi,
                payback_period_months,
                horizon_months: self.config.horizon_months,
                currency: self.config.currency.clone(),
            },
        })
    }

    fn rate_for_record(&self, snapshot: &GraphSnapshot, record: &ImpactRecord) -> f64 {
        snapshot
            .node(&record.asset_id)
            .map(|n| self.config.hourly_rate_for(n.kind))
            .unwrap_or(self.config.hourly_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        traverse, AssetKind, AssetNode, EdgeKind, GraphStore, LineageEdge, TraversalOptions,
    };
    use crate::impact::{score_impact, ChangeType};

    async fn scored_chain() -> (GraphSnapshot, ImpactAnalysisResult) {
        let store = GraphStore::new();
        for id in ["a", "b", "c"] {
            store.add_node(AssetNode::new(id, AssetKind::Table, id)).await.unwrap();
        }
        store.add_edge(LineageEdge::new("a", "b", EdgeKind::Direct)).await.unwrap();
        store.add_edge(LineageEdge::new("b", "c", EdgeKind::Direct)).await.unwrap();
        let snap = store.snapshot().await;
        let traversal = traverse(&snap, "a", &TraversalOptions::downstream()).unwrap();
        let impact = score_impact(&snap, &traversal, ChangeType::TableRemoval).unwrap();
        (snap, impact)
    }

    #[tokio::test]
    async fn test_estimate_components() {
        let (snap, impact) = scored_chain().await;
        let estimator = CostEstimator::new(CostConfig::default()).unwrap();
        let estimate = estimator.estimate(&snap, &impact).unwrap();

        let b = &estimate.breakdown;
        assert!(b.direct_cost > 0.0);
        // 500 base + 150 * 2 assets
        assert!((b.indirect_cost - 800.0).abs() < 1e-9);
        assert!(b.risk_cost > 0.0);
        assert!(
            (b.total - (b.direct_cost + b.indirect_cost + b.opportunity_cost + b.risk_cost)).abs()
                < 1e-9
        );
        assert_eq!(b.currency, "USD");
    }

    #[tokio::test]
    async fn test_zero_impact_zero_cost_null_roi() {
        let store = GraphStore::new();
        store.add_node(AssetNode::new("x", AssetKind::Table, "X")).await.unwrap();
        let snap = store.snapshot().await;
        let traversal = traverse(&snap, "x", &TraversalOptions::downstream()).unwrap();
        let impact = score_impact(&snap, &traversal, ChangeType::SchemaChange).unwrap();

        let estimator = CostEstimator::new(CostConfig::default()).unwrap();
        let estimate = estimator.estimate(&snap, &impact).unwrap();

        assert_eq!(estimate.breakdown.total, 0.0);
        // Zero benefit: ROI is null, never a division error.
        assert!(estimate.roi.roi.is_none());
        assert!(estimate.roi.payback_period_months.is_none());
    }

    #[tokio::test]
    async fn test_currency_mismatch_rejected() {
        let mut config = CostConfig::default();
        config
            .hourly_rate_overrides
            .insert(AssetKind::Model, Money::new(200.0, "EUR"));

        let err = CostEstimator::new(config).unwrap_err();
        assert!(matches!(err, TrellisError::CurrencyMismatch { .. }));
    }

    #[tokio::test]
    async fn test_kind_rate_override_applies() {
        let (snap, impact) = scored_chain().await;

        let mut config = CostConfig::default();
        config
            .hourly_rate_overrides
            .insert(AssetKind::Table, Money::new(240.0, "USD"));
        let doubled = CostEstimator::new(config).unwrap().estimate(&snap, &impact).unwrap();
        let base = CostEstimator::new(CostConfig::default())
            .unwrap()
            .estimate(&snap, &impact)
            .unwrap();

        assert!((doubled.breakdown.direct_cost - base.breakdown.direct_cost * 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CostConfig::default();
        config.horizon_months = 0.0;
        assert!(config.validate().is_err());

        let mut config = CostConfig::default();
        config.mitigation_factor = 1.2;
        assert!(config.validate().is_err());

        assert!(CostConfig::default().validate().is_ok());
    }
}
