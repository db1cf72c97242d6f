//! Configuration types for the pipeline engine
//!
//! Scoring values, the promotion threshold and SLA windows are business
//! tuning, not correctness properties, so they live here rather than in
//! the components that use them.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EngineError;
use crate::model::{EntityType, Proficiency};

/// Per-level score used by the matching engine
///
/// Must be finite, non-negative and strictly increasing with level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringScale {
    pub basic: f64,
    pub intermediate: f64,
    pub advanced: f64,
    pub expert: f64,
}

impl Default for ScoringScale {
    fn default() -> Self {
        Self {
            basic: 0.25,
            intermediate: 0.5,
            advanced: 0.75,
            expert: 1.0,
        }
    }
}

/// Fixed-point resolution of scoring values: units per 1.0
pub const SCORE_UNITS: f64 = 1_000_000_000.0;

impl ScoringScale {
    pub fn score(&self, level: Proficiency) -> f64 {
        match level {
            Proficiency::Basic => self.basic,
            Proficiency::Intermediate => self.intermediate,
            Proficiency::Advanced => self.advanced,
            Proficiency::Expert => self.expert,
        }
    }

    /// Score of `level` in whole `SCORE_UNITS`
    ///
    /// Sums of units are exact, so equal means compare equal whatever the
    /// binary representation of the configured values.
    pub fn units(&self, level: Proficiency) -> i128 {
        (self.score(level) * SCORE_UNITS).round() as i128
    }

    pub fn validate(&self) -> crate::Result<()> {
        let values = Proficiency::ALL.map(|level| self.score(level));

        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(EngineError::Config(format!(
                "scoring values must be finite and non-negative: {:?}",
                values
            )));
        }
        if values.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EngineError::Config(format!(
                "scoring values must strictly increase from basic to expert: {:?}",
                values
            )));
        }
        let units = Proficiency::ALL.map(|level| self.units(level));
        if units.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EngineError::Config(format!(
                "scoring values must differ by at least {}: {:?}",
                1.0 / SCORE_UNITS,
                values
            )));
        }
        Ok(())
    }
}

/// Staleness threshold per tracked entity type, in hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaThresholds {
    pub opportunity_hours: u32,
    pub contact_hours: u32,
}

impl Default for SlaThresholds {
    fn default() -> Self {
        Self {
            opportunity_hours: 14 * 24,
            contact_hours: 30 * 24,
        }
    }
}

impl SlaThresholds {
    pub fn threshold_for(&self, entity_type: EntityType) -> Duration {
        let hours = match entity_type {
            EntityType::Opportunity => self.opportunity_hours,
            EntityType::Contact => self.contact_hours,
        };
        Duration::hours(i64::from(hours))
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.opportunity_hours == 0 || self.contact_hours == 0 {
            return Err(EngineError::Config(
                "follow-up thresholds must be at least one hour".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_promotion_threshold() -> i64 {
    1
}

fn default_audit_capacity() -> usize {
    10_000
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    #[serde(default)]
    pub scoring: ScoringScale,

    /// Net vote tally an idea needs before it is promotable
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: i64,

    #[serde(default)]
    pub follow_up: SlaThresholds,

    /// Maximum number of audit entries kept in memory
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringScale::default(),
            promotion_threshold: default_promotion_threshold(),
            follow_up: SlaThresholds::default(),
            audit_capacity: default_audit_capacity(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML (`.yaml`/`.yml`) or JSON file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let config: Self = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.scoring.validate()?;
        self.follow_up.validate()?;
        if self.audit_capacity == 0 {
            return Err(EngineError::Config(
                "audit capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
