use crate::data::DataLoader;
use crate::error::TrainingError;
use neural_network::{Mode, Module};

/// Thresholded predictions (`output > 0`) for every example, in loader order.
pub fn predict<M, D>(model: &mut M, loader: &D) -> Result<Vec<bool>, TrainingError>
where
    M: Module + ?Sized,
    D: DataLoader + ?Sized,
{
    Ok(run(model, loader, false)?.0)
}

/// Like [`predict`], paired with the labels of the same examples.
pub fn predict_with_labels<M, D>(
    model: &mut M,
    loader: &D,
) -> Result<(Vec<bool>, Vec<f64>), TrainingError>
where
    M: Module + ?Sized,
    D: DataLoader + ?Sized,
{
    run(model, loader, true)
}

fn run<M, D>(
    model: &mut M,
    loader: &D,
    include_labels: bool,
) -> Result<(Vec<bool>, Vec<f64>), TrainingError>
where
    M: Module + ?Sized,
    D: DataLoader + ?Sized,
{
    model.set_mode(Mode::Eval);
    let mut predictions = Vec::new();
    let mut labels = Vec::new();
    for batch in loader.batches() {
        let output = model.forward(&batch.inputs)?;
        predictions.extend(output.iter().map(|&raw| raw > 0.0));
        if include_labels {
            labels.extend_from_slice(&batch.labels);
        }
    }
    Ok((predictions, labels))
}
