//! Linear support vector machine, one-vs-rest over smartcore's binary SVC
//!
//! Each class gets its own linear-kernel SVC against the rest. A linear
//! decision function is affine, so the hyperplane is read back from the fitted
//! model by scoring the origin and the unit vectors; the model keeps only those
//! weights. Prediction picks the class with the largest margin.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::svm::svc::{SVCParameters, SVC};
use smartcore::svm::Kernels;
use tracing::debug;

use super::dense::training_matrix;
use super::{argmax, check_trainable, ClassifierStrategy, LabeledMatrix, ModelParams, StrategyKind, TrainedModel};
use crate::error::{PipelineError, Result};
use crate::pipeline::frame::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    /// Soft-margin penalty.
    pub c: f64,
    /// Optimizer passes over the training rows.
    pub epochs: usize,
    /// Convergence tolerance.
    pub tol: f64,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epochs: 2,
            tol: 1e-3,
        }
    }
}

/// One hyperplane per class; the last weight of each is the bias. Classes
/// absent from training have no hyperplane and are never predicted.
#[derive(Debug, Clone)]
pub struct LinearSvm {
    weights: Vec<Option<Vec<f64>>>,
}

impl LinearSvm {
    pub fn n_classes(&self) -> usize {
        self.weights.len()
    }

    /// Signed margin of `row` for every class.
    pub fn decision_function(&self, row: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|w| w.as_deref().map_or(f64::NEG_INFINITY, |w| margin(w, row)))
            .collect()
    }

    pub fn predict_row(&self, row: &[f64]) -> usize {
        argmax(&self.decision_function(row))
    }
}

fn margin(w: &[f64], row: &[f64]) -> f64 {
    let bias = w[w.len() - 1];
    w.iter().zip(row.iter()).map(|(a, b)| a * b).sum::<f64>() + bias
}

/// The origin followed by one unit vector per feature.
fn unit_basis(n_features: usize) -> Vec<Vec<f64>> {
    let mut basis = vec![vec![0.0; n_features]];
    for j in 0..n_features {
        let mut e = vec![0.0; n_features];
        e[j] = 1.0;
        basis.push(e);
    }
    basis
}

#[derive(Debug, Clone)]
pub struct SupportVectorMachine {
    config: SvmConfig,
}

impl SupportVectorMachine {
    pub fn new(config: SvmConfig) -> Self {
        Self { config }
    }

    /// Fit `class` vs rest and read back its hyperplane.
    fn fit_one(
        &self,
        x: &DenseMatrix<f64>,
        basis: &DenseMatrix<f64>,
        labels: &[usize],
        class: usize,
        seed: u64,
    ) -> Result<Vec<f64>> {
        let y: Vec<i32> = labels.iter().map(|&l| if l == class { 1 } else { -1 }).collect();
        let params: SVCParameters<f64, i32, DenseMatrix<f64>, Vec<i32>> = SVCParameters::default()
            .with_c(self.config.c)
            .with_epoch(self.config.epochs)
            .with_tol(self.config.tol)
            .with_kernel(Kernels::linear())
            .with_seed(Some(seed));

        let svc = SVC::fit(x, &y, &params).map_err(|e| PipelineError::training(self.name(), e.to_string()))?;
        let scores = svc
            .decision_function(basis)
            .map_err(|e| PipelineError::training(self.name(), e.to_string()))?;

        let bias = scores[0];
        let mut w: Vec<f64> = scores[1..].iter().map(|s| s - bias).collect();
        w.push(bias);
        Ok(w)
    }
}

impl ClassifierStrategy for SupportVectorMachine {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SupportVectorMachine
    }

    fn train(&self, data: &LabeledMatrix, rng: &mut StdRng) -> Result<TrainedModel> {
        check_trainable(self.kind(), data)?;
        if !(self.config.c > 0.0 && self.config.c.is_finite()) || self.config.epochs == 0 {
            return Err(PipelineError::training(self.name(), "c and epochs must be positive"));
        }
        if data.observed_classes() < 2 {
            return Err(PipelineError::training(self.name(), "at least two classes are required"));
        }

        let x = training_matrix(self.kind(), &data.features.rows)?;
        let basis = training_matrix(self.kind(), &unit_basis(data.features.n_features()))?;
        let seeds: Vec<u64> = (0..data.n_classes()).map(|_| rng.gen()).collect();

        let mut present = vec![false; data.n_classes()];
        for &l in &data.labels {
            present[l] = true;
        }

        let weights = seeds
            .into_iter()
            .enumerate()
            .map(|(class, seed)| {
                if present[class] {
                    self.fit_one(&x, &basis, &data.labels, class, seed).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        if weights.iter().flatten().flatten().any(|v| !v.is_finite()) {
            return Err(PipelineError::training(self.name(), "weights diverged"));
        }

        debug!(classes = weights.len(), features = data.features.n_features(), "linear svm trained");
        Ok(TrainedModel::new(self.kind(), data, ModelParams::Svm(LinearSvm { weights })))
    }

    fn predict(&self, model: &TrainedModel, features: &FeatureMatrix) -> Result<Vec<String>> {
        let rows = model.rows_for(self.kind(), features)?;
        let ModelParams::Svm(svm) = model.params() else {
            return Err(PipelineError::ModelMismatch {
                trained: model.kind().to_string(),
                requested: self.kind().to_string(),
            });
        };
        Ok(model.names_of(rows.iter().map(|r| svm.predict_row(r)).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::labels::ClassSet;
    use rand::SeedableRng;

    fn linearly_separable() -> LabeledMatrix {
        let mut rng = StdRng::seed_from_u64(17);
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..120 {
            let class = i % 3;
            let (cx, cy) = [(0.0, 3.0), (3.0, -2.0), (-3.0, -2.0)][class];
            rows.push(vec![cx + rng.gen_range(-0.8..0.8), cy + rng.gen_range(-0.8..0.8)]);
            labels.push(class);
        }
        let features = FeatureMatrix {
            names: vec!["x".into(), "y".into()],
            rows,
        };
        LabeledMatrix::new(features, labels, ClassSet::new(["north", "east", "west"])).unwrap()
    }

    #[test]
    fn test_unit_basis_layout() {
        assert_eq!(
            unit_basis(2),
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    #[test]
    fn test_separates_three_blobs() {
        let data = linearly_separable();
        let strategy = SupportVectorMachine::new(SvmConfig::default());
        let model = strategy.train(&data, &mut StdRng::seed_from_u64(2)).unwrap();
        let predicted = strategy.predict(&model, &data.features).unwrap();

        let correct = predicted
            .iter()
            .zip(data.labels.iter())
            .filter(|&(p, &l)| p.as_str() == data.classes.name(l))
            .count();
        assert!(correct >= 108, "only {} of 120 correct", correct);
    }

    #[test]
    fn test_same_seed_same_model() {
        let data = linearly_separable();
        let strategy = SupportVectorMachine::new(SvmConfig::default());
        let margins = |seed: u64| {
            let model = strategy.train(&data, &mut StdRng::seed_from_u64(seed)).unwrap();
            let ModelParams::Svm(svm) = model.params() else {
                panic!("expected svm params");
            };
            svm.decision_function(&[0.5, 0.5])
        };
        assert_eq!(margins(4), margins(4));
    }

    #[test]
    fn test_absent_class_is_never_predicted() {
        let mut data = linearly_separable();
        data.classes = ClassSet::new(["north", "east", "west", "zulu"]);
        let strategy = SupportVectorMachine::new(SvmConfig::default());
        let model = strategy.train(&data, &mut StdRng::seed_from_u64(6)).unwrap();

        let ModelParams::Svm(svm) = model.params() else {
            panic!("expected svm params");
        };
        assert_eq!(svm.n_classes(), 4);
        assert_eq!(svm.decision_function(&[0.0, 0.0])[3], f64::NEG_INFINITY);
        assert!(strategy
            .predict(&model, &data.features)
            .unwrap()
            .iter()
            .all(|p| p != "zulu"));
    }

    #[test]
    fn test_rejects_bad_config() {
        let strategy = SupportVectorMachine::new(SvmConfig {
            c: 0.0,
            ..SvmConfig::default()
        });
        let err = strategy
            .train(&linearly_separable(), &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(err, PipelineError::TrainingFailure { .. }));
    }
}
