//! Configuration module for Trellis.

use crate::error::{Result, TrellisError};
use crate::impact::{CostConfig, ScoringConfig};
use crate::jobs::JobsConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the analysis engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrellisConfig {
    /// Impact scoring configuration.
    pub scoring: ScoringConfig,
    /// Cost/ROI estimator configuration.
    pub cost: CostConfig,
    /// Job manager configuration.
    pub jobs: JobsConfig,
}

impl TrellisConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrellisError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| TrellisError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.cost.validate()?;
        if self.jobs.event_capacity == 0 {
            return Err(TrellisError::InvalidConfig {
                field: "jobs.event_capacity".to_string(),
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrellisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_scoring_weights_rejected() {
        let mut config = TrellisConfig::default();
        config.scoring.weights.dependency_density = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let config = TrellisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TrellisConfig = serde_json::from_str(&json).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.cost.currency, config.cost.currency);
    }
}
