//! Run configuration
//!
//! Built from CLI flags or loaded from a JSON file. Every field has a default,
//! so a partial JSON document is valid.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::classifier::{default_strategies, StrategySpec};
use crate::error::{PipelineError, Result};
use crate::pipeline::correlation::DEFAULT_CORRELATION_CUTOFF;
use crate::pipeline::evaluate::UnknownLabelPolicy;
use crate::pipeline::identifiers::default_identifier_columns;
use crate::pipeline::missing::DEFAULT_MISSING_THRESHOLD;
use crate::pipeline::normalize::DegeneratePolicy;
use crate::pipeline::variance::VarianceConfig;

pub const DEFAULT_LABEL: &str = "classe";
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_BUILD_FRACTION: f64 = 0.7;
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;

/// How the selector orders candidates with equal test accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Faster training wins, then strategy priority. Wall-clock times vary
    /// between runs, so equal-accuracy winners can too.
    TrainingTimeThenPriority,
    /// Strategy priority only. Fully reproducible; the default.
    PriorityOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the label column.
    pub label: String,
    /// Columns with a missing ratio at or above this are dropped.
    pub missing_threshold: f64,
    pub identifier_columns: Vec<String>,
    pub variance: VarianceConfig,
    /// Maximum |r| allowed between two retained columns.
    pub correlation_cutoff: f64,
    pub degenerate_policy: DegeneratePolicy,
    /// Share of labeled rows kept for model building; the rest is validation.
    pub build_fraction: f64,
    /// Share of the build rows used for training; the rest is testing.
    pub train_fraction: f64,
    pub seed: u64,
    pub tie_break: TieBreak,
    pub unknown_labels: UnknownLabelPolicy,
    /// Train strategies concurrently on the rayon pool.
    pub parallel: bool,
    pub strategies: Vec<StrategySpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            missing_threshold: DEFAULT_MISSING_THRESHOLD,
            identifier_columns: default_identifier_columns(),
            variance: VarianceConfig::default(),
            correlation_cutoff: DEFAULT_CORRELATION_CUTOFF,
            degenerate_policy: DegeneratePolicy::Reject,
            build_fraction: DEFAULT_BUILD_FRACTION,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            seed: DEFAULT_SEED,
            tie_break: TieBreak::PriorityOnly,
            unknown_labels: UnknownLabelPolicy::CountAsMiss,
            parallel: true,
            strategies: default_strategies(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("label column name is empty".to_string()));
        }
        if !(self.missing_threshold > 0.0 && self.missing_threshold <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "missing_threshold must be in (0, 1], got {}",
                self.missing_threshold
            )));
        }
        if !(self.correlation_cutoff > 0.0 && self.correlation_cutoff <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "correlation_cutoff must be in (0, 1], got {}",
                self.correlation_cutoff
            )));
        }
        for (name, fraction) in [
            ("build_fraction", self.build_fraction),
            ("train_fraction", self.train_fraction),
        ] {
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{} must be in (0, 1), got {}",
                    name, fraction
                )));
            }
        }
        if self.strategies.is_empty() {
            return Err(PipelineError::InvalidConfig("no classifier strategies configured".to_string()));
        }
        Ok(())
    }
}
