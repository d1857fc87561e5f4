use crate::error::NetworkError;
use crate::optimizer::{Optimizer, OptimizerBuilder};
use crate::parameter::Parameter;
use matrix::Matrix;

/// Stochastic gradient descent with optional heavy-ball momentum and L2
/// weight decay.
#[derive(Debug, Clone)]
pub struct Sgd {
    learning_rate: f64,
    momentum: f64,
    weight_decay: f64,
    velocities: Vec<Matrix>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        SgdBuilder::default().build(learning_rate, None, 0.0)
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, params: &mut [&mut Parameter]) -> Result<(), NetworkError> {
        let mut trainable: Vec<&mut Parameter> = params
            .iter_mut()
            .filter(|param| param.requires_grad())
            .map(|param| &mut **param)
            .collect();
        if self.momentum != 0.0 && self.velocities.len() < trainable.len() {
            self.velocities.resize_with(trainable.len(), Matrix::default);
        }

        for (index, param) in trainable.iter_mut().enumerate() {
            let mut grad = param.grad().clone();
            if self.weight_decay != 0.0 {
                grad = grad.add(&param.value().scale(self.weight_decay));
            }

            let momentum = self.momentum;
            let direction = match self.velocities.get_mut(index) {
                Some(velocity) if momentum != 0.0 => {
                    if velocity.shape() != grad.shape() {
                        *velocity = Matrix::zeros_like(&grad);
                    }
                    *velocity = velocity.zip_map(&grad, |v, g| momentum * v + g);
                    velocity.clone()
                }
                _ => grad,
            };

            param.descend(&direction.scale(self.learning_rate))?;
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SgdBuilder {
    pub momentum: f64,
}

impl OptimizerBuilder for SgdBuilder {
    type Optimizer = Sgd;

    fn build(&self, learning_rate: f64, momentum: Option<f64>, weight_decay: f64) -> Sgd {
        Sgd {
            learning_rate,
            momentum: momentum.unwrap_or(self.momentum),
            weight_decay,
            velocities: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plain_step() -> Result<(), NetworkError> {
        let mut parameter = Parameter::new(Matrix::filled(1, 1, 1.0));
        parameter.accumulate_grad(&Matrix::filled(1, 1, 2.0))?;
        Sgd::new(0.25).step(&mut [&mut parameter])?;
        assert_relative_eq!(parameter.value().get(0, 0).unwrap_or(f64::NAN), 0.5);
        Ok(())
    }

    #[test]
    fn test_momentum_accumulates_across_steps() -> Result<(), NetworkError> {
        let mut parameter = Parameter::new(Matrix::filled(1, 1, 0.0));
        parameter.accumulate_grad(&Matrix::filled(1, 1, 1.0))?;
        let mut sgd = SgdBuilder { momentum: 0.5 }.build(1.0, None, 0.0);

        sgd.step(&mut [&mut parameter])?;
        sgd.step(&mut [&mut parameter])?;

        // velocities 1.0 then 1.5
        assert_relative_eq!(parameter.value().get(0, 0).unwrap_or(f64::NAN), -2.5);
        Ok(())
    }
}
