//! Bridges between feature rows and smartcore estimators
//!
//! smartcore works on a row-major `DenseMatrix` and integer class codes. Codes
//! are the class indices of the training `ClassSet`, so a prediction maps back
//! to a class name without a lookup table.

use smartcore::linalg::basic::matrix::DenseMatrix;

use super::StrategyKind;
use crate::error::{PipelineError, Result};

pub(crate) fn training_matrix(kind: StrategyKind, rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>> {
    DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(|e| PipelineError::training(kind.label(), e.to_string()))
}

pub(crate) fn class_codes(labels: &[usize]) -> Vec<u32> {
    labels.iter().map(|&l| l as u32).collect()
}

/// Map predicted codes back to class indices, rejecting codes outside the class set.
pub(crate) fn class_indices(kind: StrategyKind, codes: &[u32], n_classes: usize) -> Result<Vec<usize>> {
    codes
        .iter()
        .map(|&code| {
            let index = code as usize;
            if index < n_classes {
                Ok(index)
            } else {
                Err(PipelineError::prediction(
                    kind.label(),
                    format!("class code {} outside {} trained classes", code, n_classes),
                ))
            }
        })
        .collect()
}

/// Run `score` over `rows` as one matrix. An empty input yields no predictions
/// without reaching the estimator.
pub(crate) fn predict_rows<F>(kind: StrategyKind, rows: &[Vec<f64>], score: F) -> Result<Vec<usize>>
where
    F: FnOnce(&DenseMatrix<f64>) -> Result<Vec<usize>>,
{
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let x = DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(|e| PipelineError::prediction(kind.label(), e.to_string()))?;
    score(&x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_class_indices() {
        let codes = class_codes(&[2, 0, 1]);
        assert_eq!(codes, vec![2, 0, 1]);
        assert_eq!(class_indices(StrategyKind::DecisionTree, &codes, 3).unwrap(), vec![2, 0, 1]);
    }

    #[test]
    fn test_unknown_code_is_prediction_failure() {
        let err = class_indices(StrategyKind::RandomForest, &[0, 5], 3).unwrap_err();
        assert!(matches!(err, PipelineError::PredictionFailure { .. }));
    }

    #[test]
    fn test_empty_rows_skip_estimator() {
        let predicted = predict_rows(StrategyKind::DecisionTree, &[], |_| panic!("estimator called")).unwrap();
        assert!(predicted.is_empty());
    }
}
