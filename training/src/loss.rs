use crate::error::TrainingError;
use matrix::Matrix;

/// Mean loss over a batch together with its gradient with respect to the model output.
#[derive(Debug, Clone, PartialEq)]
pub struct LossValue {
    pub value: f64,
    pub gradient: Matrix,
}

/// A differentiable loss between model output and targets of the same shape.
pub trait Loss {
    fn compute(&self, output: &Matrix, target: &Matrix) -> Result<LossValue, TrainingError>;
}

fn check_shapes(output: &Matrix, target: &Matrix) -> Result<(), TrainingError> {
    if output.shape() != target.shape() {
        return Err(TrainingError::ShapeMismatch {
            context: "loss",
            expected: target.shape(),
            actual: output.shape(),
        });
    }
    if output.is_empty() {
        return Err(TrainingError::EmptyDataset("loss batch"));
    }
    Ok(())
}

/// Binary cross-entropy on raw logits, averaged over every element.
///
/// Uses `max(x, 0) - x * y + ln(1 + e^-|x|)` so large logits do not overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct BceWithLogits;

impl Loss for BceWithLogits {
    fn compute(&self, output: &Matrix, target: &Matrix) -> Result<LossValue, TrainingError> {
        check_shapes(output, target)?;
        let n = output.len() as f64;
        let value = output
            .zip_map(target, |x, y| x.max(0.0) - x * y + (-x.abs()).exp().ln_1p())
            .sum()
            / n;
        let gradient = output.zip_map(target, |x, y| (sigmoid(x) - y) / n);
        Ok(LossValue { value, gradient })
    }
}

/// Mean squared error.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl Loss for MeanSquaredError {
    fn compute(&self, output: &Matrix, target: &Matrix) -> Result<LossValue, TrainingError> {
        check_shapes(output, target)?;
        let n = output.len() as f64;
        let diff = output.subtract(target);
        Ok(LossValue {
            value: diff.map(|d| d * d).sum() / n,
            gradient: diff.scale(2.0 / n),
        })
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use matrix::matrix;

    #[test]
    fn test_bce_at_zero_logit() -> Result<(), TrainingError> {
        let loss = BceWithLogits.compute(&matrix![0.0; 0.0], &matrix![1.0; 0.0])?;
        assert_relative_eq!(loss.value, std::f64::consts::LN_2, epsilon = 1e-12);
        assert_relative_eq!(loss.gradient.get(0, 0).unwrap_or(f64::NAN), -0.25);
        assert_relative_eq!(loss.gradient.get(1, 0).unwrap_or(f64::NAN), 0.25);
        Ok(())
    }

    #[test]
    fn test_bce_is_stable_for_large_logits() -> Result<(), TrainingError> {
        let loss = BceWithLogits.compute(&matrix![1000.0; -1000.0], &matrix![1.0; 0.0])?;
        assert!(loss.value.is_finite());
        assert_relative_eq!(loss.value, 0.0, epsilon = 1e-12);

        let wrong = BceWithLogits.compute(&matrix![-1000.0], &matrix![1.0])?;
        assert_relative_eq!(wrong.value, 1000.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_mean_squared_error() -> Result<(), TrainingError> {
        let loss = MeanSquaredError.compute(&matrix![1.0; 3.0], &matrix![0.0; 1.0])?;
        assert_relative_eq!(loss.value, 2.5);
        assert_eq!(loss.gradient, matrix![1.0; 2.0]);
        Ok(())
    }

    #[test]
    fn test_shape_mismatch() {
        let result = MeanSquaredError.compute(&matrix![1.0, 2.0], &matrix![1.0; 2.0]);
        assert!(matches!(
            result,
            Err(TrainingError::ShapeMismatch {
                expected: (2, 1),
                actual: (1, 2),
                ..
            })
        ));
    }
}
