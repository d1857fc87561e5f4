//! Switching parameters in and out of training.

use crate::error::TrainingError;
use neural_network::{Module, Parameterized};

/// Sets `requires_grad` on every parameter of `model`.
pub fn set_trainable<P>(model: &mut P, trainable: bool)
where
    P: Parameterized + ?Sized,
{
    for parameter in model.parameters_mut() {
        parameter.set_requires_grad(trainable);
    }
}

/// Makes layer `layer_index` of the group `group_id` trainable.
///
/// The usual progressive-unfreezing step: freeze everything with
/// [`set_trainable`], then reopen layers one at a time.
pub fn unfreeze<M>(model: &mut M, layer_index: usize, group_id: &str) -> Result<(), TrainingError>
where
    M: Module + ?Sized,
{
    let group = model
        .group_mut(group_id)
        .ok_or_else(|| TrainingError::MissingGroup {
            group_id: group_id.to_string(),
        })?;
    let len = group.len();
    let layer = group
        .get_mut(layer_index)
        .ok_or(TrainingError::LayerIndexOutOfRange {
            index: layer_index,
            len,
        })?;
    set_trainable(layer, true);
    Ok(())
}
