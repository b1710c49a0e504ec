//! Train every strategy on the same partition and pick a winner
//!
//! Candidates are ranked by test accuracy. Ties go to the strategy priority,
//! or first to the faster trainer under `TieBreak::TrainingTimeThenPriority`.
//! The validation subset is only scored for the winner, after the choice is
//! made.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{ClassifierStrategy, LabeledMatrix, StrategyKind, StrategySpec, TrainedModel};
use crate::error::{PipelineError, Result};
use crate::pipeline::config::{PipelineConfig, TieBreak};
use crate::pipeline::evaluate::{ConfusionMatrix, Evaluator, UnknownLabelPolicy};
use crate::pipeline::frame::FeatureMatrix;

/// Labeled matrices of one partition, all sharing the same class set.
#[derive(Debug, Clone)]
pub struct PartitionData {
    pub train: LabeledMatrix,
    pub test: LabeledMatrix,
    pub validation: LabeledMatrix,
}

/// Result line for one strategy.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub strategy: StrategyKind,
    /// Position in the configured strategy list.
    pub position: usize,
    pub training_time: Duration,
    pub test_accuracy: Option<f64>,
    pub test_kappa: Option<f64>,
    /// Failure message when training or evaluation failed.
    pub error: Option<String>,
    pub selected: bool,
}

impl CandidateReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

struct Scored {
    model: TrainedModel,
    test: ConfusionMatrix,
}

struct CandidateRun {
    report: CandidateReport,
    scored: Option<Scored>,
}

/// The winning strategy with its model and scores.
pub struct SelectionOutcome {
    strategy: Arc<dyn ClassifierStrategy>,
    model: TrainedModel,
    test: ConfusionMatrix,
    validation: ConfusionMatrix,
    candidates: Vec<CandidateReport>,
}

impl SelectionOutcome {
    pub fn winner(&self) -> StrategyKind {
        self.model.kind()
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn test_matrix(&self) -> &ConfusionMatrix {
        &self.test
    }

    /// Out-of-sample estimate for the winner; never used for selection.
    pub fn validation_matrix(&self) -> &ConfusionMatrix {
        &self.validation
    }

    pub fn candidates(&self) -> &[CandidateReport] {
        &self.candidates
    }

    /// Predict with the winning model.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<String>> {
        self.strategy.predict(&self.model, features)
    }
}

pub struct ModelSelector {
    strategies: Vec<Arc<dyn ClassifierStrategy>>,
    tie_break: TieBreak,
    unknown_labels: UnknownLabelPolicy,
    parallel: bool,
}

impl ModelSelector {
    pub fn new(
        strategies: Vec<Arc<dyn ClassifierStrategy>>,
        tie_break: TieBreak,
        unknown_labels: UnknownLabelPolicy,
        parallel: bool,
    ) -> Self {
        Self {
            strategies,
            tie_break,
            unknown_labels,
            parallel,
        }
    }

    pub fn from_specs(specs: &[StrategySpec], config: &PipelineConfig) -> Self {
        let strategies: Vec<Arc<dyn ClassifierStrategy>> = specs.iter().map(|s| Arc::from(s.build())).collect();
        Self::new(strategies, config.tie_break, config.unknown_labels, config.parallel)
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::from_specs(&config.strategies, config)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Train and score every strategy, then pick the winner.
    ///
    /// One seed per strategy is drawn from `rng` before any training starts,
    /// so the result does not depend on scheduling. Fails with
    /// `AllStrategiesFailed` when no strategy produced a scored model.
    pub fn select(&self, data: &PartitionData, rng: &mut StdRng) -> Result<SelectionOutcome> {
        if self.strategies.is_empty() {
            return Err(PipelineError::InvalidConfig("no classifier strategies configured".to_string()));
        }

        let evaluator = Evaluator::new(data.train.classes.clone(), self.unknown_labels);
        let test_truth = truth_of(&data.test);
        let seeds: Vec<u64> = self.strategies.iter().map(|_| rng.gen()).collect();

        let jobs: Vec<(usize, &Arc<dyn ClassifierStrategy>, u64)> = self
            .strategies
            .iter()
            .zip(seeds)
            .enumerate()
            .map(|(position, (strategy, seed))| (position, strategy, seed))
            .collect();

        let run = |&(position, strategy, seed): &(usize, &Arc<dyn ClassifierStrategy>, u64)| {
            run_candidate(position, &**strategy, seed, data, &test_truth, &evaluator)
        };
        let mut runs: Vec<CandidateRun> = if self.parallel {
            jobs.par_iter().map(run).collect()
        } else {
            jobs.iter().map(run).collect()
        };

        let best = runs
            .iter()
            .enumerate()
            .filter(|(_, r)| r.scored.is_some())
            .min_by(|(_, a), (_, b)| self.rank(&a.report, &b.report))
            .map(|(i, _)| i)
            .ok_or(PipelineError::AllStrategiesFailed(runs.len()))?;

        runs[best].report.selected = true;
        let strategy = Arc::clone(&self.strategies[runs[best].report.position]);
        let candidates: Vec<CandidateReport> = runs.iter().map(|r| r.report.clone()).collect();
        let Scored { model, test } = runs
            .swap_remove(best)
            .scored
            .ok_or(PipelineError::AllStrategiesFailed(candidates.len()))?;

        let validation_predictions = strategy.predict(&model, &data.validation.features)?;
        let validation = evaluator.evaluate(&truth_of(&data.validation), &validation_predictions)?;

        info!(
            winner = %model.kind(),
            test_accuracy = test.accuracy(),
            validation_accuracy = validation.accuracy(),
            "model selected"
        );

        Ok(SelectionOutcome {
            strategy,
            model,
            test,
            validation,
            candidates,
        })
    }

    /// Ordering where `Less` means "better".
    fn rank(&self, a: &CandidateReport, b: &CandidateReport) -> Ordering {
        let accuracy = |r: &CandidateReport| r.test_accuracy.unwrap_or(f64::NEG_INFINITY);
        let by_accuracy = accuracy(b).total_cmp(&accuracy(a));
        let by_time = match self.tie_break {
            TieBreak::TrainingTimeThenPriority => a.training_time.cmp(&b.training_time),
            TieBreak::PriorityOnly => Ordering::Equal,
        };
        by_accuracy
            .then(by_time)
            .then(a.strategy.priority().cmp(&b.strategy.priority()))
            .then(a.position.cmp(&b.position))
    }
}

fn truth_of(data: &LabeledMatrix) -> Vec<String> {
    data.labels
        .iter()
        .map(|&l| data.classes.name(l).to_string())
        .collect()
}

fn run_candidate(
    position: usize,
    strategy: &dyn ClassifierStrategy,
    seed: u64,
    data: &PartitionData,
    test_truth: &[String],
    evaluator: &Evaluator,
) -> CandidateRun {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Instant::now();
    let trained = strategy.train(&data.train, &mut rng);
    let training_time = start.elapsed();

    let scored = trained.and_then(|model| {
        let predicted = strategy.predict(&model, &data.test.features)?;
        let test = evaluator.evaluate(test_truth, &predicted)?;
        Ok(Scored { model, test })
    });

    let mut report = CandidateReport {
        strategy: strategy.kind(),
        position,
        training_time,
        test_accuracy: None,
        test_kappa: None,
        error: None,
        selected: false,
    };

    match scored {
        Ok(scored) => {
            report.test_accuracy = Some(scored.test.accuracy());
            report.test_kappa = scored.test.kappa();
            info!(
                strategy = strategy.name(),
                accuracy = scored.test.accuracy(),
                seconds = training_time.as_secs_f64(),
                "strategy evaluated"
            );
            CandidateRun {
                report,
                scored: Some(scored),
            }
        }
        Err(e) => {
            warn!(strategy = strategy.name(), error = %e, "strategy failed");
            report.error = Some(e.to_string());
            CandidateRun { report, scored: None }
        }
    }
}
