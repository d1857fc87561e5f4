use matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::E;

/// Element-wise activation applied to the output of a dense layer.
///
/// Derivatives are expressed in terms of the *activated* value, which is what
/// layers cache during the forward pass.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationType {
    Sigmoid,
    Relu,
    Tanh,
    /// No activation; used for logit outputs.
    #[default]
    Identity,
}

impl ActivationType {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationType::Relu => x.max(0.0),
            ActivationType::Tanh => x.tanh(),
            ActivationType::Identity => x,
        }
    }

    pub fn derivative(&self, y: f64) -> f64 {
        match self {
            ActivationType::Sigmoid => y * (1.0 - y),
            ActivationType::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationType::Tanh => 1.0 - y * y,
            ActivationType::Identity => 1.0,
        }
    }

    pub fn apply_matrix(&self, m: &Matrix) -> Matrix {
        let activation = *self;
        m.map(|x| activation.apply(x))
    }

    pub fn derivative_matrix(&self, activated: &Matrix) -> Matrix {
        let activation = *self;
        activated.map(|y| activation.derivative(y))
    }
}
