use crate::error::TrainingError;

/// Exponential moving average of the loss with bias correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningLoss {
    beta: f64,
    average: f64,
    step: usize,
}

impl RunningLoss {
    /// Fails unless `beta` lies in `[0, 1)`.
    pub fn new(beta: f64) -> Result<Self, TrainingError> {
        if !(0.0..1.0).contains(&beta) {
            return Err(TrainingError::InvalidSchedule(format!(
                "smoothing beta {beta} must be in [0, 1)"
            )));
        }
        Ok(Self {
            beta,
            average: 0.0,
            step: 0,
        })
    }

    /// Folds in one batch loss and returns the bias-corrected estimate.
    pub fn update(&mut self, loss: f64) -> f64 {
        self.step += 1;
        self.average = self.beta * self.average + (1.0 - self.beta) * loss;
        self.corrected()
    }

    /// Bias-corrected estimate, `None` before the first update.
    pub fn smoothed(&self) -> Option<f64> {
        (self.step > 0).then(|| self.corrected())
    }

    pub fn step(&self) -> usize {
        self.step
    }

    fn corrected(&self) -> f64 {
        // beta^i32::MAX is already 0 for any beta below 1
        let exponent = i32::try_from(self.step).unwrap_or(i32::MAX);
        self.average / (1.0 - self.beta.powi(exponent))
    }
}

/// Lowest smoothed loss seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestLoss(Option<f64>);

impl BestLoss {
    /// Records `smoothed` when it improves on the best, or when nothing was recorded yet.
    pub fn observe(&mut self, smoothed: f64) {
        match self.0 {
            Some(best) if smoothed >= best => {}
            _ => self.0 = Some(smoothed),
        }
    }

    pub fn get(&self) -> Option<f64> {
        self.0
    }

    /// True once `smoothed` exceeds `factor` times the best loss.
    pub fn exceeded_by(&self, smoothed: f64, factor: f64) -> bool {
        self.0.is_some_and(|best| smoothed > factor * best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_step_is_exact() -> Result<(), TrainingError> {
        for beta in [0.0, 0.5, 0.9, 0.98, 0.999] {
            let mut running = RunningLoss::new(beta)?;
            assert_relative_eq!(running.update(3.7), 3.7, max_relative = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_beta_outside_unit_interval_is_rejected() {
        for beta in [1.0, 1.5, -0.1, f64::NAN] {
            assert!(matches!(
                RunningLoss::new(beta),
                Err(TrainingError::InvalidSchedule(_))
            ));
        }
    }

    #[test]
    fn test_constant_loss_converges() -> Result<(), TrainingError> {
        let mut running = RunningLoss::new(0.98)?;
        let mut smoothed = 0.0;
        for _ in 0..2000 {
            smoothed = running.update(2.5);
        }
        assert_relative_eq!(smoothed, 2.5, max_relative = 1e-9);
        assert_eq!(running.step(), 2000);
        Ok(())
    }

    #[test]
    fn test_smoothed_before_update() -> Result<(), TrainingError> {
        let mut running = RunningLoss::new(0.98)?;
        assert_eq!(running.smoothed(), None);
        running.update(2.0);
        assert_eq!(running.smoothed(), Some(2.0));
        Ok(())
    }

    #[test]
    fn test_best_loss_tracks_minimum() {
        let mut best = BestLoss::default();
        assert!(!best.exceeded_by(100.0, 4.0));

        best.observe(3.0);
        best.observe(1.0);
        best.observe(2.0);
        assert_eq!(best.get(), Some(1.0));
        assert!(best.exceeded_by(4.5, 4.0));
        assert!(!best.exceeded_by(4.0, 4.0));
    }
}
