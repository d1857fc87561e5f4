use crate::error::NetworkError;
use crate::optimizer::{Optimizer, OptimizerBuilder};
use crate::parameter::Parameter;
use matrix::Matrix;

/// Adam with L2 weight decay folded into the gradient.
///
/// Update rule, per trainable parameter `p` with gradient `g`:
///
/// ```text
/// g  = g + weight_decay * p
/// m  = beta1 * m + (1 - beta1) * g
/// v  = beta2 * v + (1 - beta2) * g^2
/// p -= lr * (m / (1 - beta1^t)) / (sqrt(v / (1 - beta2^t)) + epsilon)
/// ```
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    weight_decay: f64,
    t: i32,
    moments: Vec<(Matrix, Matrix)>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        AdamBuilder::default().build(learning_rate, None, 0.0)
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Parameter]) -> Result<(), NetworkError> {
        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);
        let (beta1, beta2, epsilon) = (self.beta1, self.beta2, self.epsilon);
        let step_size = self.learning_rate / bias_correction1;

        let mut trainable: Vec<&mut Parameter> = params
            .iter_mut()
            .filter(|param| param.requires_grad())
            .map(|param| &mut **param)
            .collect();
        if self.moments.len() < trainable.len() {
            self.moments.resize_with(trainable.len(), Default::default);
        }

        for (param, (m, v)) in trainable.iter_mut().zip(self.moments.iter_mut()) {
            let grad = if self.weight_decay == 0.0 {
                param.grad().clone()
            } else {
                param.grad().add(&param.value().scale(self.weight_decay))
            };

            if m.shape() != grad.shape() {
                *m = Matrix::zeros_like(&grad);
                *v = Matrix::zeros_like(&grad);
            }
            *m = m.zip_map(&grad, |m, g| beta1 * m + (1.0 - beta1) * g);
            *v = v.zip_map(&grad, |v, g| beta2 * v + (1.0 - beta2) * g * g);

            let update = m.zip_map(v, |m, v| {
                step_size * m / ((v / bias_correction2).sqrt() + epsilon)
            });
            param.descend(&update)?;
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

/// Hyper-parameters for [`Adam`] other than the learning rate.
#[derive(Debug, Clone, Copy)]
pub struct AdamBuilder {
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamBuilder {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl OptimizerBuilder for AdamBuilder {
    type Optimizer = Adam;

    /// A supplied `momentum` replaces `beta1`.
    fn build(&self, learning_rate: f64, momentum: Option<f64>, weight_decay: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: momentum.unwrap_or(self.beta1),
            beta2: self.beta2,
            epsilon: self.epsilon,
            weight_decay,
            t: 0,
            moments: Vec::new(),
        }
    }
}
