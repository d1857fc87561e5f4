//! The contract a trainable model fulfils.
//!
//! Training code never looks inside a model: it runs forward and backward
//! passes, flips the train/eval mode, and reaches parameters either all at
//! once or through named layer groups.

use crate::error::NetworkError;
use crate::parameter::Parameter;
use matrix::Matrix;
use serde::{Deserialize, Serialize};

/// Train mode caches activations and applies dropout; eval mode does neither.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// Anything that owns parameters.
pub trait Parameterized {
    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;
}

pub trait Module: Parameterized {
    /// Sub-module type stored in named groups.
    type Layer: Parameterized;

    /// Maps a batch (one example per row) to raw outputs, one row per example.
    fn forward(&mut self, inputs: &Matrix) -> Result<Matrix, NetworkError>;

    /// Accumulates parameter gradients given the gradient of the loss with
    /// respect to the output of the last training-mode forward pass.
    fn backward(&mut self, grad_output: &Matrix) -> Result<(), NetworkError>;

    fn set_mode(&mut self, mode: Mode);

    fn mode(&self) -> Mode;

    /// Layers of the group named `group_id`, or `None` if no such group exists.
    fn group_mut(&mut self, group_id: &str) -> Option<&mut [Self::Layer]>;
}
