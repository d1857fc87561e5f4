use crate::data::DataLoader;
use crate::error::TrainingError;
use crate::loss::Loss;
use crate::metrics::{Metric, MetricResult};
use neural_network::{Mode, Module};
use tracing::debug;

/// Runs `model` in eval mode over every validation batch once.
///
/// The loss is averaged with batch-size weights and reported as `val_loss`,
/// followed by each metric over the thresholded predictions (`output > 0`).
/// The model is left in eval mode.
pub fn evaluate<M, L, D>(
    model: &mut M,
    valid: &D,
    loss: &L,
    metrics: &[Box<dyn Metric>],
) -> Result<MetricResult, TrainingError>
where
    M: Module + ?Sized,
    L: Loss + ?Sized,
    D: DataLoader + ?Sized,
{
    model.set_mode(Mode::Eval);

    let mut sum_loss = 0.0;
    let mut total = 0usize;
    let mut y_pred = Vec::new();
    let mut y_true = Vec::new();

    for batch in valid.batches() {
        let output = model.forward(&batch.inputs)?;
        let batch_loss = loss.compute(&output, &batch.targets())?;
        sum_loss += batch.len() as f64 * batch_loss.value;
        total += batch.len();
        y_pred.extend(output.iter().map(|&raw| raw > 0.0));
        y_true.extend_from_slice(&batch.labels);
    }

    if total == 0 {
        return Err(TrainingError::EmptyDataset("validation"));
    }

    let mut result = MetricResult::new(sum_loss / total as f64);
    for metric in metrics {
        result.insert(metric.name(), metric.score(&y_pred, &y_true)?);
    }
    debug!(examples = total, %result, "evaluated");
    Ok(result)
}
