//! Confusion matrix and classification metrics
//!
//! Rows of the matrix are true classes, columns predicted classes. Predictions
//! outside the trained class set have no column; they are tallied per true
//! class as misses.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pipeline::labels::ClassSet;

/// What to do with a predicted label outside the trained class set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLabelPolicy {
    /// Count it as a miss in the true class's row.
    CountAsMiss,
    /// Fail the evaluation with `UnknownLabel`.
    Reject,
}

/// Per-class one-vs-rest rates. `None` when the denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: String,
    /// Rows whose true label is this class.
    pub support: usize,
    pub sensitivity: Option<f64>,
    pub specificity: Option<f64>,
    pub precision: Option<f64>,
    pub balanced_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    classes: Vec<String>,
    counts: Vec<Vec<usize>>,
    unknown: Vec<usize>,
    total: usize,
}

impl ConfusionMatrix {
    /// Cross-tabulate `truth` against `predicted`.
    ///
    /// Sequences of different length are `InputLengthMismatch`. A true label
    /// outside `classes` is always `UnknownLabel`; an unknown prediction follows
    /// `policy`.
    pub fn from_labels(
        truth: &[String],
        predicted: &[String],
        classes: &ClassSet,
        policy: UnknownLabelPolicy,
    ) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(PipelineError::InputLengthMismatch {
                truth: truth.len(),
                predicted: predicted.len(),
            });
        }

        let k = classes.len();
        let mut counts = vec![vec![0usize; k]; k];
        let mut unknown = vec![0usize; k];

        for (t, p) in truth.iter().zip(predicted.iter()) {
            let row = classes
                .index_of(t)
                .ok_or_else(|| PipelineError::UnknownLabel { label: t.clone() })?;
            match (classes.index_of(p), policy) {
                (Some(col), _) => counts[row][col] += 1,
                (None, UnknownLabelPolicy::CountAsMiss) => unknown[row] += 1,
                (None, UnknownLabelPolicy::Reject) => {
                    return Err(PipelineError::UnknownLabel { label: p.clone() });
                }
            }
        }

        Ok(Self {
            classes: classes.as_slice().to_vec(),
            counts,
            unknown,
            total: truth.len(),
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Count of rows with true class `actual` predicted as `predicted`.
    pub fn count(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    pub fn unknown(&self, actual: usize) -> usize {
        self.unknown[actual]
    }

    pub fn unknown_total(&self) -> usize {
        self.unknown.iter().sum()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Rows whose true class is `actual`, including unknown predictions.
    pub fn row_sum(&self, actual: usize) -> usize {
        self.counts[actual].iter().sum::<usize>() + self.unknown[actual]
    }

    /// Rows predicted as `predicted`.
    pub fn column_sum(&self, predicted: usize) -> usize {
        self.counts.iter().map(|row| row[predicted]).sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.classes.len()).map(|i| self.counts[i][i]).sum()
    }

    /// Trace over total; 0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct() as f64 / self.total as f64
    }

    pub fn error_rate(&self) -> f64 {
        1.0 - self.accuracy()
    }

    /// Cohen's kappa: agreement beyond what the marginals give by chance.
    pub fn kappa(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let n = self.total as f64;
        let expected: f64 = (0..self.classes.len())
            .map(|i| self.row_sum(i) as f64 * self.column_sum(i) as f64)
            .sum::<f64>()
            / (n * n);
        if (1.0 - expected).abs() < f64::EPSILON {
            return None;
        }
        Some((self.accuracy() - expected) / (1.0 - expected))
    }

    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.classes.len()).map(|i| self.metrics_for(i)).collect()
    }

    fn metrics_for(&self, class: usize) -> ClassMetrics {
        let tp = self.counts[class][class];
        let positives = self.row_sum(class);
        let negatives = self.total - positives;
        let false_pos = self.column_sum(class) - tp;
        let true_neg = negatives - false_pos;

        let ratio = |num: usize, den: usize| (den > 0).then(|| num as f64 / den as f64);
        let sensitivity = ratio(tp, positives);
        let specificity = ratio(true_neg, negatives);
        let balanced_accuracy = match (sensitivity, specificity) {
            (Some(se), Some(sp)) => Some((se + sp) / 2.0),
            _ => None,
        };

        ClassMetrics {
            class: self.classes[class].clone(),
            support: positives,
            sensitivity,
            specificity,
            precision: ratio(tp, self.column_sum(class)),
            balanced_accuracy,
        }
    }
}

/// Evaluates predictions against truth with a fixed class set and policy.
#[derive(Debug, Clone)]
pub struct Evaluator {
    classes: ClassSet,
    policy: UnknownLabelPolicy,
}

impl Evaluator {
    pub fn new(classes: ClassSet, policy: UnknownLabelPolicy) -> Self {
        Self { classes, policy }
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    pub fn evaluate(&self, truth: &[String], predicted: &[String]) -> Result<ConfusionMatrix> {
        ConfusionMatrix::from_labels(truth, predicted, &self.classes, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(ClassSet::new(["A", "B", "C"]), UnknownLabelPolicy::CountAsMiss)
    }

    #[test]
    fn test_perfect_predictions() {
        let truth = strings(&["A", "B", "C", "A"]);
        let cm = evaluator().evaluate(&truth, &truth).unwrap();
        assert_eq!(cm.accuracy(), 1.0);
        assert_eq!(cm.error_rate(), 0.0);
        assert_eq!(cm.kappa(), Some(1.0));
    }

    #[test]
    fn test_counts_and_rates() {
        let truth = strings(&["A", "A", "A", "B", "B", "C"]);
        let predicted = strings(&["A", "A", "B", "B", "C", "C"]);
        let cm = evaluator().evaluate(&truth, &predicted).unwrap();

        assert_eq!(cm.count(0, 0), 2);
        assert_eq!(cm.count(0, 1), 1);
        assert_eq!(cm.correct(), 4);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-12);

        let a = &cm.class_metrics()[0];
        assert_eq!(a.support, 3);
        assert_eq!(a.sensitivity, Some(2.0 / 3.0));
        assert_eq!(a.specificity, Some(1.0));
        assert_eq!(a.precision, Some(1.0));

        let b = &cm.class_metrics()[1];
        // one of four non-B rows predicted B
        assert_eq!(b.specificity, Some(0.75));
    }

    #[test]
    fn test_length_mismatch() {
        let err = evaluator()
            .evaluate(&strings(&["A", "B"]), &strings(&["A"]))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InputLengthMismatch {
                truth: 2,
                predicted: 1
            }
        ));
    }

    #[test]
    fn test_unknown_prediction_policies() {
        let truth = strings(&["A", "B"]);
        let predicted = strings(&["A", "Z"]);

        let cm = evaluator().evaluate(&truth, &predicted).unwrap();
        assert_eq!(cm.unknown(1), 1);
        assert_eq!(cm.row_sum(1), 1);
        assert_eq!(cm.accuracy(), 0.5);

        let strict = Evaluator::new(ClassSet::new(["A", "B", "C"]), UnknownLabelPolicy::Reject);
        assert!(matches!(
            strict.evaluate(&truth, &predicted).unwrap_err(),
            PipelineError::UnknownLabel { ref label } if label == "Z"
        ));
    }

    #[test]
    fn test_unknown_truth_always_rejected() {
        let err = evaluator()
            .evaluate(&strings(&["Q"]), &strings(&["A"]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownLabel { .. }));
    }

    #[test]
    fn test_empty_input() {
        let cm = evaluator().evaluate(&[], &[]).unwrap();
        assert_eq!(cm.total(), 0);
        assert_eq!(cm.accuracy(), 0.0);
        assert_eq!(cm.kappa(), None);
    }
}
