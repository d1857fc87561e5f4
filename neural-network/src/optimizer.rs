//! Optimizer contract
use crate::error::NetworkError;
use crate::parameter::Parameter;

/// Updates parameters from their accumulated gradients.
///
/// Parameters with `requires_grad == false` are skipped by `step`, which is
/// the equivalent of building the optimizer over the trainable parameters
/// only.
pub trait Optimizer {
    /// Perform a single optimization step
    fn step(&mut self, params: &mut [&mut Parameter]) -> Result<(), NetworkError>;

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [&mut Parameter]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn learning_rate(&self) -> f64;
}

/// Creates optimizers bound to a learning rate.
///
/// Training drivers call [`OptimizerBuilder::build`] once per batch to inject
/// the scheduled learning rate (and momentum, where the optimizer has one).
pub trait OptimizerBuilder {
    type Optimizer: Optimizer;

    fn build(&self, learning_rate: f64, momentum: Option<f64>, weight_decay: f64)
    -> Self::Optimizer;
}
