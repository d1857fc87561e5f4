//! Fully connected layer with an activation and optional inverted dropout.
use crate::activations::ActivationType;
use crate::error::NetworkError;
use crate::module::{Mode, Parameterized};
use crate::parameter::Parameter;
use matrix::Matrix;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dense layer computing `activation(inputs · W + b)`.
///
/// `W` has one row per input feature and one column per node; `b` is a single
/// row. The input, activated output and dropout mask of the last training-mode
/// forward pass are cached for [`Layer::backward`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Layer {
    weights: Parameter,
    bias: Parameter,
    activation: ActivationType,
    #[serde(default)]
    dropout: f64,
    #[serde(skip)]
    cache: Option<LayerCache>,
}

#[derive(Debug, Clone)]
struct LayerCache {
    input: Matrix,
    activated: Matrix,
    mask: Option<Matrix>,
}

impl Layer {
    /// Creates a layer with weights drawn from `U(-1/sqrt(inputs), 1/sqrt(inputs))`.
    pub fn new(inputs: usize, nodes: usize, activation: ActivationType, dropout: f64) -> Self {
        let bound = 1.0 / (inputs.max(1) as f64).sqrt();
        Self::from_parameters(
            Matrix::random(inputs, nodes, bound),
            Matrix::random(1, nodes, bound),
            activation,
        )
        .with_dropout(dropout)
    }

    /// Creates a layer from explicit weights (`inputs x nodes`) and bias (`1 x nodes`).
    pub fn from_parameters(weights: Matrix, bias: Matrix, activation: ActivationType) -> Self {
        Self {
            weights: Parameter::new(weights),
            bias: Parameter::new(bias),
            activation,
            dropout: 0.0,
            cache: None,
        }
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout.clamp(0.0, 0.99);
        self
    }

    pub fn inputs(&self) -> usize {
        self.weights.value().rows()
    }

    pub fn nodes(&self) -> usize {
        self.weights.value().cols()
    }

    pub fn activation(&self) -> ActivationType {
        self.activation
    }

    pub fn weights(&self) -> &Parameter {
        &self.weights
    }

    pub fn bias(&self) -> &Parameter {
        &self.bias
    }

    pub fn forward(&mut self, input: &Matrix, mode: Mode) -> Result<Matrix, NetworkError> {
        if input.cols() != self.inputs() {
            return Err(NetworkError::ShapeMismatch {
                context: "layer input",
                expected: (input.rows(), self.inputs()),
                actual: input.shape(),
            });
        }

        let weighted = input.dot_multiply(self.weights.value());
        let activated = self
            .activation
            .apply_matrix(&weighted.add_row(self.bias.value()));

        if mode == Mode::Eval {
            self.cache = None;
            return Ok(activated);
        }

        let mask = (self.dropout > 0.0).then(|| dropout_mask(activated.shape(), self.dropout));
        let output = match &mask {
            Some(mask) => activated.elementwise_multiply(mask),
            None => activated.clone(),
        };
        self.cache = Some(LayerCache {
            input: input.clone(),
            activated,
            mask,
        });
        Ok(output)
    }

    /// Accumulates gradients for `W` and `b` and returns the gradient with
    /// respect to the layer input.
    pub fn backward(&mut self, grad_output: &Matrix) -> Result<Matrix, NetworkError> {
        let cache = self.cache.as_ref().ok_or(NetworkError::MissingActivations)?;
        if grad_output.shape() != cache.activated.shape() {
            return Err(NetworkError::ShapeMismatch {
                context: "layer output gradient",
                expected: cache.activated.shape(),
                actual: grad_output.shape(),
            });
        }

        let grad = match &cache.mask {
            Some(mask) => grad_output.elementwise_multiply(mask),
            None => grad_output.clone(),
        };
        let delta = grad.elementwise_multiply(&self.activation.derivative_matrix(&cache.activated));

        self.weights
            .accumulate_grad(&cache.input.transpose().dot_multiply(&delta))?;
        self.bias.accumulate_grad(&delta.sum_rows())?;

        Ok(delta.dot_multiply(&self.weights.value().transpose()))
    }
}

impl Parameterized for Layer {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weights, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weights, &mut self.bias]
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{{ inputs: {}, nodes: {}, activation: {:?}, dropout: {} }}",
            self.inputs(),
            self.nodes(),
            self.activation,
            self.dropout
        )
    }
}

/// Inverted dropout: kept units are scaled by `1 / (1 - rate)`.
fn dropout_mask(shape: (usize, usize), rate: f64) -> Matrix {
    let mut rng = rand::rng();
    let keep = 1.0 - rate;
    Matrix::from_shape_fn(shape.0, shape.1, |_| {
        if rng.random_bool(keep) { 1.0 / keep } else { 0.0 }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use matrix::matrix;

    fn linear_layer() -> Layer {
        Layer::from_parameters(
            matrix![
                1.0, -1.0;
                2.0, 0.5
            ],
            matrix![0.5, 0.0],
            ActivationType::Identity,
        )
    }

    #[test]
    fn test_forward_computes_affine_map() -> Result<(), NetworkError> {
        let mut layer = linear_layer();
        let output = layer.forward(&matrix![1.0, 1.0], Mode::Train)?;
        assert_eq!(output, matrix![3.5, -0.5]);
        Ok(())
    }

    #[test]
    fn test_forward_rejects_wrong_width() {
        let mut layer = linear_layer();
        let result = layer.forward(&matrix![1.0, 2.0, 3.0], Mode::Train);
        assert!(matches!(result, Err(NetworkError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_backward_accumulates_gradients() -> Result<(), NetworkError> {
        let mut layer = linear_layer();
        layer.forward(
            &matrix![
                1.0, 2.0;
                3.0, 4.0
            ],
            Mode::Train,
        )?;
        let grad_input = layer.backward(&matrix![
            1.0, 0.0;
            0.0, 1.0
        ])?;

        // dW = x^T · g, db = column sums of g, dx = g · W^T
        assert_eq!(
            layer.weights().grad(),
            &matrix![
                1.0, 3.0;
                2.0, 4.0
            ]
        );
        assert_eq!(layer.bias().grad(), &matrix![1.0, 1.0]);
        assert_eq!(
            grad_input,
            matrix![
                1.0, 2.0;
                -1.0, 0.5
            ]
        );
        Ok(())
    }

    #[test]
    fn test_eval_mode_does_not_cache() -> Result<(), NetworkError> {
        let mut layer = linear_layer();
        layer.forward(&matrix![1.0, 1.0], Mode::Eval)?;
        assert!(matches!(
            layer.backward(&matrix![1.0, 1.0]),
            Err(NetworkError::MissingActivations)
        ));
        Ok(())
    }

    #[test]
    fn test_dropout_only_applies_in_train_mode() -> Result<(), NetworkError> {
        let mut layer = Layer::from_parameters(
            Matrix::filled(1, 64, 1.0),
            Matrix::zeros(1, 64),
            ActivationType::Identity,
        )
        .with_dropout(0.5);

        let eval = layer.forward(&matrix![1.0], Mode::Eval)?;
        assert!(eval.iter().all(|&v| v == 1.0));

        let train = layer.forward(&matrix![1.0], Mode::Train)?;
        assert!(train.iter().all(|&v| v == 0.0 || v == 2.0));
        Ok(())
    }

    #[test]
    fn test_sigmoid_backward_uses_activated_output() -> Result<(), NetworkError> {
        let mut layer = Layer::from_parameters(
            Matrix::zeros(1, 1),
            Matrix::zeros(1, 1),
            ActivationType::Sigmoid,
        );
        layer.forward(&matrix![2.0], Mode::Train)?;
        layer.backward(&matrix![1.0])?;
        // sigmoid(0) = 0.5, derivative 0.25, input 2.0
        assert_relative_eq!(layer.weights().grad().get(0, 0).unwrap_or(f64::NAN), 0.5);
        assert_relative_eq!(layer.bias().grad().get(0, 0).unwrap_or(f64::NAN), 0.25);
        Ok(())
    }
}
