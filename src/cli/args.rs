//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use crate::classifier::{StrategyKind, StrategySpec};
use crate::pipeline::config::{PipelineConfig, TieBreak};
use crate::pipeline::normalize::DegeneratePolicy;

/// Harsel - select features, cross-validate several classifiers and predict with the best
#[derive(Parser, Debug)]
#[command(name = "harsel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Labeled training file (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Unlabeled cases to predict (same columns as the input, minus the label)
    #[arg(short, long)]
    pub predict: Option<PathBuf>,

    /// Label column name [default: classe]
    #[arg(short, long)]
    pub label: Option<String>,

    /// Predictions output path (CSV or Parquet, determined by extension).
    /// Defaults to the input directory with a '_predictions.csv' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Column of the cases file copied next to each prediction (e.g. problem_id)
    #[arg(long)]
    pub id_column: Option<String>,

    /// Seed for partitioning and every stochastic classifier [default: 42]
    #[arg(long)]
    pub seed: Option<u64>,

    /// Drop columns whose missing ratio is at or above this value [default: 0.25]
    #[arg(long, value_parser = validate_ratio)]
    pub missing_threshold: Option<f64>,

    /// Maximum absolute correlation allowed between retained columns [default: 0.90]
    #[arg(long, value_parser = validate_ratio)]
    pub correlation_cutoff: Option<f64>,

    /// Strategies to compare, comma-separated: rf, gbm, svm, tree [default: all]
    #[arg(long, value_delimiter = ',', value_parser = parse_strategy)]
    pub strategies: Vec<StrategyKind>,

    /// Train strategies one after another instead of in parallel
    #[arg(long, default_value = "false")]
    pub sequential: bool,

    /// How to break ties in test accuracy [default: priority]. `time` prefers
    /// faster training, so runs with equal accuracies may pick different winners
    #[arg(long, value_enum)]
    pub tie_break: Option<TieBreakArg>,

    /// Leave zero-variance columns unscaled instead of failing
    #[arg(long, default_value = "false")]
    pub skip_degenerate: bool,

    /// JSON configuration file; flags given on the command line override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print debug diagnostics
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print per-column statistics of a file and exit
    Profile {
        /// Input file path (CSV or Parquet)
        input: PathBuf,

        /// Number of rows to use for schema inference.
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TieBreakArg {
    /// Faster training wins, then strategy priority
    Time,
    /// Strategy priority only
    Priority,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::Time => TieBreak::TrainingTimeThenPriority,
            TieBreakArg::Priority => TieBreak::PriorityOnly,
        }
    }
}

impl Cli {
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Get the predictions path, deriving it from the input if not explicitly provided.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(self.output.clone().unwrap_or_else(|| {
            let parent = input.parent().unwrap_or_else(|| Path::new("."));
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}_predictions.csv", stem))
        }))
    }

    /// Build the run configuration: defaults, then the config file, then flags.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(label) = &self.label {
            config.label = label.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(threshold) = self.missing_threshold {
            config.missing_threshold = threshold;
        }
        if let Some(cutoff) = self.correlation_cutoff {
            config.correlation_cutoff = cutoff;
        }
        if let Some(tie_break) = self.tie_break {
            config.tie_break = tie_break.into();
        }
        if self.sequential {
            config.parallel = false;
        }
        if self.skip_degenerate {
            config.degenerate_policy = DegeneratePolicy::Skip;
        }
        if !self.strategies.is_empty() {
            config.strategies = self
                .strategies
                .iter()
                .map(|&kind| {
                    config
                        .strategies
                        .iter()
                        .find(|s| s.kind() == kind)
                        .cloned()
                        .unwrap_or_else(|| StrategySpec::default_for(kind))
                })
                .collect();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Validator for ratio parameters in (0, 1]
fn validate_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("value must be greater than 0.0 and at most 1.0, got {}", value))
    }
}

fn parse_strategy(s: &str) -> Result<StrategyKind, String> {
    StrategyKind::from_short_name(s)
        .ok_or_else(|| format!("unknown strategy '{}' (expected rf, gbm, svm or tree)", s))
}
