use crate::error::NetworkError;
use matrix::Matrix;
use serde::{Deserialize, Serialize};

/// A trainable tensor together with its accumulated gradient.
///
/// Gradients accumulate across backward passes until [`Parameter::zero_grad`]
/// is called. Only the value and the `requires_grad` flag are serialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "StoredParameter", into = "StoredParameter")]
pub struct Parameter {
    value: Matrix,
    grad: Matrix,
    requires_grad: bool,
}

#[derive(Serialize, Deserialize)]
struct StoredParameter {
    value: Matrix,
    requires_grad: bool,
}

impl From<StoredParameter> for Parameter {
    fn from(stored: StoredParameter) -> Self {
        let mut parameter = Parameter::new(stored.value);
        parameter.requires_grad = stored.requires_grad;
        parameter
    }
}

impl From<Parameter> for StoredParameter {
    fn from(parameter: Parameter) -> Self {
        Self {
            value: parameter.value,
            requires_grad: parameter.requires_grad,
        }
    }
}

impl Parameter {
    /// Wraps `value` as a trainable parameter with a zeroed gradient.
    pub fn new(value: Matrix) -> Self {
        let grad = Matrix::zeros_like(&value);
        Self {
            value,
            grad,
            requires_grad: true,
        }
    }

    pub fn value(&self) -> &Matrix {
        &self.value
    }

    pub fn grad(&self) -> &Matrix {
        &self.grad
    }

    pub fn shape(&self) -> (usize, usize) {
        self.value.shape()
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Adds `grad` to the accumulated gradient. Frozen parameters ignore it.
    pub fn accumulate_grad(&mut self, grad: &Matrix) -> Result<(), NetworkError> {
        self.check_shape("gradient accumulation", grad)?;
        if self.requires_grad {
            self.grad.add_assign(grad);
        }
        Ok(())
    }

    /// Replaces the value, keeping the shape fixed.
    pub fn set_value(&mut self, value: Matrix) -> Result<(), NetworkError> {
        self.check_shape("parameter assignment", &value)?;
        self.value = value;
        Ok(())
    }

    /// `value -= delta`
    pub fn descend(&mut self, delta: &Matrix) -> Result<(), NetworkError> {
        self.check_shape("parameter update", delta)?;
        self.value = self.value.subtract(delta);
        Ok(())
    }

    fn check_shape(&self, context: &'static str, other: &Matrix) -> Result<(), NetworkError> {
        if other.shape() != self.value.shape() {
            return Err(NetworkError::ShapeMismatch {
                context,
                expected: self.value.shape(),
                actual: other.shape(),
            });
        }
        Ok(())
    }
}
