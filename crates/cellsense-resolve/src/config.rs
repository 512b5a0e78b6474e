//! Tunable constants for scanning and scoring.
//!
//! The defaults were tuned informally against engineering design sheets;
//! treat them as a starting point rather than a calibrated contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Weights combined by the candidate scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringWeights {
    /// Base score for candidates in the target's own row.
    pub same_row_base: f64,
    /// Base score for candidates in the row above.
    pub adjacent_row_base: f64,
    /// Bonus when the candidate sits in the hinted label/symbol column.
    pub layout_bonus: f64,
    /// Proximity bonus is `max(0, (proximity_span - distance) * proximity_step)`.
    pub proximity_span: f64,
    pub proximity_step: f64,
    /// Multiplier applied to unclassified text used as a symbol fallback.
    pub symbol_fallback_scale: f64,
    /// Multiplier applied to unclassified text used as a label fallback.
    pub label_fallback_scale: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            same_row_base: 100.0,
            adjacent_row_base: 70.0,
            layout_bonus: 50.0,
            proximity_span: 6.0,
            proximity_step: 5.0,
            symbol_fallback_scale: 0.3,
            label_fallback_scale: 0.4,
        }
    }
}

/// Bounds on every scan the resolver performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanLimits {
    /// Columns scanned leftwards from the target in its own row.
    pub left_window: u32,
    /// Column offsets (relative to the target) probed in the row above.
    pub above_offsets: Vec<i64>,
    /// Columns scanned rightwards from a label when building the label map.
    pub label_map_right_window: u32,
    /// Rows searched for a legend header.
    pub legend_header_rows: usize,
    /// Rows after the legend header searched for legend entries.
    pub legend_body_rows: usize,
    /// Rows sent to a layout hint provider as a sample.
    pub hint_sample_rows: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            left_window: 10,
            above_offsets: vec![-5, -3, -1],
            label_map_right_window: 5,
            legend_header_rows: 100,
            legend_body_rows: 10,
            hint_sample_rows: 20,
        }
    }
}

/// Which entry [`crate::LabelMap::get`] returns when a label repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    pub weights: ScoringWeights,
    pub scan: ScanLimits,
    pub provider_timeout_ms: u64,
    pub label_map_policy: DuplicatePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            scan: ScanLimits::default(),
            provider_timeout_ms: 5_000,
            label_map_policy: DuplicatePolicy::default(),
        }
    }
}

impl ResolverConfig {
    /// Construct a config by reading YAML from any reader.
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        let weights = [
            ("weights.same_row_base", w.same_row_base),
            ("weights.adjacent_row_base", w.adjacent_row_base),
            ("weights.layout_bonus", w.layout_bonus),
            ("weights.proximity_span", w.proximity_span),
            ("weights.proximity_step", w.proximity_step),
            ("weights.symbol_fallback_scale", w.symbol_fallback_scale),
            ("weights.label_fallback_scale", w.label_fallback_scale),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("must be a finite, non-negative number (got {value})"),
                });
            }
        }
        if self.scan.left_window == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.left_window",
                message: "must scan at least one column".to_string(),
            });
        }
        if self.scan.label_map_right_window == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.label_map_right_window",
                message: "must scan at least one column".to_string(),
            });
        }
        if self.provider_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "provider_timeout_ms",
                message: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}
