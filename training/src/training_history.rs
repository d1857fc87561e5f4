use crate::error::TrainingError;
use crate::metrics::MetricResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Outcome of one training epoch: mean training loss and the validation metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    /// 1-based epoch number
    pub epoch: usize,
    /// Batch-size weighted mean training loss
    pub train_loss: f64,
    /// Validation results, `val_loss` first
    pub metrics: MetricResult,
}

impl fmt::Display for EpochSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch No.:{}, Train loss: {:.4}, {}",
            self.epoch, self.train_loss, self.metrics
        )
    }
}

/// Training history containing the summaries recorded during a triangular run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochSummary>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_epoch(&mut self, summary: EpochSummary) {
        self.epochs.push(summary);
    }

    pub fn last(&self) -> Option<&EpochSummary> {
        self.epochs.last()
    }

    pub fn train_losses(&self) -> Vec<f64> {
        self.epochs.iter().map(|epoch| epoch.train_loss).collect()
    }

    /// Epoch with the highest value of `metric`, if any epoch recorded it.
    pub fn best_by(&self, metric: &str) -> Option<&EpochSummary> {
        self.epochs
            .iter()
            .filter(|epoch| epoch.metrics.get(metric).is_some_and(f64::is_finite))
            .max_by(|a, b| {
                let a = a.metrics.get(metric).unwrap_or(f64::NEG_INFINITY);
                let b = b.metrics.get(metric).unwrap_or(f64::NEG_INFINITY);
                a.total_cmp(&b)
            })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainingError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Prints a summary of the training history
    pub fn print_summary(&self) {
        println!("\nTraining History Summary:");
        println!("------------------------");
        match self.last() {
            Some(last) => println!("Final: {last}"),
            None => println!("No epochs recorded"),
        }
        if let Some(best) = self.best_by("accuracy_score") {
            println!("Best accuracy_score in epoch {}", best.epoch);
        }
    }
}
