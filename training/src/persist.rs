//! Parameter state saved to and restored from JSON files.

use crate::error::TrainingError;
use matrix::Matrix;
use neural_network::Parameterized;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

/// Parameter values in the order the model reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDict {
    pub parameters: Vec<Matrix>,
}

impl StateDict {
    pub fn capture<P>(model: &P) -> Self
    where
        P: Parameterized + ?Sized,
    {
        Self {
            parameters: model
                .parameters()
                .into_iter()
                .map(|parameter| parameter.value().clone())
                .collect(),
        }
    }

    /// Copies the stored values into `model`, leaving it untouched on mismatch.
    pub fn restore<P>(self, model: &mut P) -> Result<(), TrainingError>
    where
        P: Parameterized + ?Sized,
    {
        let mut targets = model.parameters_mut();
        if targets.len() != self.parameters.len() {
            return Err(TrainingError::StateMismatch(format!(
                "saved state has {} parameters, model has {}",
                self.parameters.len(),
                targets.len()
            )));
        }
        if let Some((index, (target, value))) = targets
            .iter()
            .zip(&self.parameters)
            .enumerate()
            .find(|(_, (target, value))| target.shape() != value.shape())
        {
            return Err(TrainingError::StateMismatch(format!(
                "parameter {index}: saved shape {:?}, model shape {:?}",
                value.shape(),
                target.shape()
            )));
        }
        for (target, value) in targets.iter_mut().zip(self.parameters) {
            target.set_value(value)?;
        }
        Ok(())
    }
}

/// Writes the parameter values of `model` to `path`, creating parent directories.
pub fn save_model<P, Q>(model: &P, path: Q) -> Result<(), TrainingError>
where
    P: Parameterized + ?Sized,
    Q: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &StateDict::capture(model))?;
    debug!(path = %path.display(), "saved model state");
    Ok(())
}

/// Loads parameter values saved by [`save_model`] into `model`.
pub fn load_model<P, Q>(model: &mut P, path: Q) -> Result<(), TrainingError>
where
    P: Parameterized + ?Sized,
    Q: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let state: StateDict = serde_json::from_reader(reader)?;
    state.restore(model)?;
    debug!(path = %path.display(), "restored model state");
    Ok(())
}
