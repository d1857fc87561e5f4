//! Validation metrics over thresholded predictions.

use crate::error::TrainingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key under which the evaluator stores the size-weighted validation loss.
pub const VAL_LOSS: &str = "val_loss";

/// A score over boolean predictions and the true labels.
///
/// Labels above `0.5` count as the positive class.
pub trait Metric {
    /// Stable key used in [`MetricResult`].
    fn name(&self) -> &str;

    fn score(&self, y_pred: &[bool], y_true: &[f64]) -> Result<f64, TrainingError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Confusion {
    true_positive: usize,
    false_positive: usize,
    true_negative: usize,
    false_negative: usize,
}

impl Confusion {
    fn tally(y_pred: &[bool], y_true: &[f64]) -> Result<Self, TrainingError> {
        if y_pred.len() != y_true.len() {
            return Err(TrainingError::DataMismatch(format!(
                "{} predictions but {} labels",
                y_pred.len(),
                y_true.len()
            )));
        }
        let mut confusion = Self::default();
        for (&predicted, &label) in y_pred.iter().zip(y_true) {
            match (predicted, label > 0.5) {
                (true, true) => confusion.true_positive += 1,
                (true, false) => confusion.false_positive += 1,
                (false, false) => confusion.true_negative += 1,
                (false, true) => confusion.false_negative += 1,
            }
        }
        Ok(confusion)
    }

    fn precision(&self) -> f64 {
        ratio(
            self.true_positive,
            self.true_positive + self.false_positive,
        )
    }

    fn recall(&self) -> f64 {
        ratio(
            self.true_positive,
            self.true_positive + self.false_negative,
        )
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Fraction of predictions that match their label.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accuracy;

impl Metric for Accuracy {
    fn name(&self) -> &str {
        "accuracy_score"
    }

    fn score(&self, y_pred: &[bool], y_true: &[f64]) -> Result<f64, TrainingError> {
        let c = Confusion::tally(y_pred, y_true)?;
        Ok(ratio(c.true_positive + c.true_negative, y_pred.len()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Precision;

impl Metric for Precision {
    fn name(&self) -> &str {
        "precision_score"
    }

    fn score(&self, y_pred: &[bool], y_true: &[f64]) -> Result<f64, TrainingError> {
        Ok(Confusion::tally(y_pred, y_true)?.precision())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Recall;

impl Metric for Recall {
    fn name(&self) -> &str {
        "recall_score"
    }

    fn score(&self, y_pred: &[bool], y_true: &[f64]) -> Result<f64, TrainingError> {
        Ok(Confusion::tally(y_pred, y_true)?.recall())
    }
}

/// Harmonic mean of precision and recall.
#[derive(Debug, Clone, Copy, Default)]
pub struct F1;

impl Metric for F1 {
    fn name(&self) -> &str {
        "f1_score"
    }

    fn score(&self, y_pred: &[bool], y_true: &[f64]) -> Result<f64, TrainingError> {
        let c = Confusion::tally(y_pred, y_true)?;
        let (precision, recall) = (c.precision(), c.recall());
        if precision + recall == 0.0 {
            Ok(0.0)
        } else {
            Ok(2.0 * precision * recall / (precision + recall))
        }
    }
}

/// Named scores from one evaluation pass, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    entries: Vec<(String, f64)>,
}

impl MetricResult {
    pub fn new(val_loss: f64) -> Self {
        Self {
            entries: vec![(VAL_LOSS.to_string(), val_loss)],
        }
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|&(_, value)| value)
    }

    pub fn val_loss(&self) -> f64 {
        self.get(VAL_LOSS).unwrap_or(f64::NAN)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MetricResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value:.4}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PREDICTED: [bool; 6] = [true, true, false, false, true, false];
    const LABELS: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

    #[test]
    fn test_accuracy() -> Result<(), TrainingError> {
        assert_relative_eq!(Accuracy.score(&PREDICTED, &LABELS)?, 4.0 / 6.0);
        Ok(())
    }

    #[test]
    fn test_precision_recall_f1() -> Result<(), TrainingError> {
        // tp 2, fp 1, fn 1
        assert_relative_eq!(Precision.score(&PREDICTED, &LABELS)?, 2.0 / 3.0);
        assert_relative_eq!(Recall.score(&PREDICTED, &LABELS)?, 2.0 / 3.0);
        assert_relative_eq!(F1.score(&PREDICTED, &LABELS)?, 2.0 / 3.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_zero_division_scores_zero() -> Result<(), TrainingError> {
        let none = [false, false];
        let negatives = [0.0, 0.0];
        assert_eq!(Precision.score(&none, &negatives)?, 0.0);
        assert_eq!(Recall.score(&none, &negatives)?, 0.0);
        assert_eq!(F1.score(&none, &negatives)?, 0.0);
        assert_eq!(Accuracy.score(&[], &[])?, 0.0);
        Ok(())
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            Accuracy.score(&[true], &[1.0, 0.0]),
            Err(TrainingError::DataMismatch(_))
        ));
    }

    #[test]
    fn test_metric_result_display() {
        let mut result = MetricResult::new(0.5);
        result.insert(Accuracy.name(), 0.75);
        assert_eq!(result.to_string(), "val_loss: 0.5000, accuracy_score: 0.7500");
        assert_eq!(result.get("accuracy_score"), Some(0.75));
        assert_eq!(result.val_loss(), 0.5);
        assert_eq!(result.len(), 2);
    }
}
