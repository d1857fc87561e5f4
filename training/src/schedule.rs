//! Learning-rate and momentum schedules.
//!
//! Both generators are pure: they only turn a handful of scalars into
//! per-batch sequences that the drivers index with their step counter.

use crate::error::TrainingError;

/// Momentum at the low end of the triangular cycle.
pub const MOMENTUM_LOW: f64 = 0.85;
/// Momentum at the high end of the triangular cycle, also held during the decay tail.
pub const MOMENTUM_HIGH: f64 = 0.95;

/// Per-step learning rates and momenta of a triangular policy.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangularSchedule {
    pub rates: Vec<f64>,
    pub momenta: Vec<f64>,
}

impl TriangularSchedule {
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rate and momentum for step `index`.
    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.rates.get(index)?, *self.momenta.get(index)?))
    }
}

/// Log-spaced rates from `low_rate` to `high_rate`, both endpoints included.
///
/// ```
/// use training::range_finder_schedule;
///
/// let rates = range_finder_schedule(1e-5, 10.0, 20).unwrap();
/// assert_eq!(rates.len(), 20);
/// assert!((rates[0] - 1e-5).abs() < 1e-15);
/// assert!((rates[19] - 10.0).abs() < 1e-9);
/// ```
pub fn range_finder_schedule(
    low_rate: f64,
    high_rate: f64,
    total_steps: usize,
) -> Result<Vec<f64>, TrainingError> {
    Ok(range_finder_exponents(low_rate, high_rate, total_steps)?
        .into_iter()
        .map(|exponent| 10f64.powf(exponent))
        .collect())
}

/// `log10` of [`range_finder_schedule`], computed directly on the exponent grid.
pub(crate) fn range_finder_exponents(
    low_rate: f64,
    high_rate: f64,
    total_steps: usize,
) -> Result<Vec<f64>, TrainingError> {
    if total_steps == 0 {
        return Err(TrainingError::InvalidSchedule(
            "range finder needs at least one step".to_string(),
        ));
    }
    if !(low_rate > 0.0 && low_rate.is_finite()) {
        return Err(TrainingError::InvalidSchedule(format!(
            "low rate must be positive, got {low_rate}"
        )));
    }
    if !(high_rate > low_rate && high_rate.is_finite()) {
        return Err(TrainingError::InvalidSchedule(format!(
            "high rate {high_rate} must exceed low rate {low_rate}"
        )));
    }
    Ok(linspace_inclusive(
        low_rate.log10(),
        high_rate.log10(),
        total_steps,
    ))
}

/// Triangular learning-rate policy with inverse momentum.
///
/// With `half = floor(half_cycle_pct * total_steps)` the rates rise
/// `low -> high` over `half` steps, fall `high -> low` over `half` steps and
/// decay `low -> 0` over the remaining steps. Every segment excludes its far
/// endpoint. Momentum falls `0.95 -> 0.85`, rises back, then holds at `0.95`.
///
/// A `half_cycle_pct` above `0.5` is clamped so the half cycle never exceeds
/// `total_steps / 2`; the decay tail is then empty and both sequences still
/// have exactly `total_steps` entries.
pub fn triangular_schedule(
    low_rate: f64,
    high_rate: f64,
    total_steps: usize,
    half_cycle_pct: f64,
) -> Result<TriangularSchedule, TrainingError> {
    if !(half_cycle_pct >= 0.0 && half_cycle_pct.is_finite()) {
        return Err(TrainingError::InvalidSchedule(format!(
            "half cycle percentage must be a non-negative number, got {half_cycle_pct}"
        )));
    }
    if !(low_rate.is_finite() && high_rate.is_finite()) {
        return Err(TrainingError::InvalidSchedule(format!(
            "rates must be finite, got {low_rate} and {high_rate}"
        )));
    }

    let half_cycle = ((half_cycle_pct * total_steps as f64) as usize).min(total_steps / 2);
    let left = total_steps - 2 * half_cycle;

    let mut rates = Vec::with_capacity(total_steps);
    rates.extend(linspace_exclusive(low_rate, high_rate, half_cycle));
    rates.extend(linspace_exclusive(high_rate, low_rate, half_cycle));
    rates.extend(linspace_exclusive(low_rate, 0.0, left));

    let mut momenta = Vec::with_capacity(total_steps);
    momenta.extend(linspace_exclusive(MOMENTUM_HIGH, MOMENTUM_LOW, half_cycle));
    momenta.extend(linspace_exclusive(MOMENTUM_LOW, MOMENTUM_HIGH, half_cycle));
    momenta.extend(std::iter::repeat_n(MOMENTUM_HIGH, left));

    debug_assert_eq!(rates.len(), momenta.len());
    Ok(TriangularSchedule { rates, momenta })
}

/// `num` evenly spaced values over `[start, stop)`.
fn linspace_exclusive(start: f64, stop: f64, num: usize) -> impl Iterator<Item = f64> {
    let step = if num == 0 {
        0.0
    } else {
        (stop - start) / num as f64
    };
    (0..num).map(move |i| start + i as f64 * step)
}

/// `num` evenly spaced values over `[start, stop]`; the last value is exactly `stop`.
fn linspace_inclusive(start: f64, stop: f64, num: usize) -> Vec<f64> {
    if num == 1 {
        return vec![start];
    }
    let step = (stop - start) / (num - 1) as f64;
    (0..num)
        .map(|i| {
            if i + 1 == num {
                stop
            } else {
                start + i as f64 * step
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangular_schedule_lengths() -> Result<(), TrainingError> {
        for total in [0, 1, 2, 7, 20, 101, 1000] {
            for pct in [0.0, 0.1, 0.45, 0.49, 0.5, 0.51, 0.9] {
                let schedule = triangular_schedule(1e-5, 0.01, total, pct)?;
                assert_eq!(schedule.rates.len(), total, "total {total}, pct {pct}");
                assert_eq!(schedule.momenta.len(), total, "total {total}, pct {pct}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_triangular_schedule_half_cycle_exactly_half() -> Result<(), TrainingError> {
        let schedule = triangular_schedule(0.0, 1.0, 8, 0.5)?;
        assert_eq!(
            schedule.rates,
            vec![0.0, 0.25, 0.5, 0.75, 1.0, 0.75, 0.5, 0.25]
        );
        assert!(schedule.momenta.iter().all(|&m| m <= MOMENTUM_HIGH));
        Ok(())
    }

    #[test]
    fn test_triangular_schedule_segments() -> Result<(), TrainingError> {
        // half_cycle = floor(0.3 * 10) = 3, tail of 4
        let schedule = triangular_schedule(0.1, 0.4, 10, 0.3)?;
        let expected_rates = [0.1, 0.2, 0.3, 0.4, 0.3, 0.2, 0.1, 0.075, 0.05, 0.025];
        for (rate, expected) in schedule.rates.iter().zip(expected_rates) {
            assert_relative_eq!(*rate, expected, epsilon = 1e-12);
        }

        let third = (MOMENTUM_HIGH - MOMENTUM_LOW) / 3.0;
        let expected_momenta = [
            0.95,
            0.95 - third,
            0.95 - 2.0 * third,
            0.85,
            0.85 + third,
            0.85 + 2.0 * third,
            0.95,
            0.95,
            0.95,
            0.95,
        ];
        for (momentum, expected) in schedule.momenta.iter().zip(expected_momenta) {
            assert_relative_eq!(*momentum, expected, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_triangular_schedule_never_emits_zero_rate() -> Result<(), TrainingError> {
        let schedule = triangular_schedule(1e-5, 0.01, 50, 0.45)?;
        assert!(schedule.rates.iter().all(|&r| r > 0.0));
        assert_eq!(schedule.get(0), Some((1e-5, MOMENTUM_HIGH)));
        assert_eq!(schedule.get(50), None);
        Ok(())
    }

    #[test]
    fn test_triangular_schedule_rejects_negative_pct() {
        assert!(matches!(
            triangular_schedule(1e-5, 0.01, 10, -0.1),
            Err(TrainingError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn test_range_finder_schedule() -> Result<(), TrainingError> {
        let rates = range_finder_schedule(1e-5, 10.0, 20)?;
        assert_eq!(rates.len(), 20);
        assert_relative_eq!(rates[0], 1e-5, max_relative = 1e-12);
        assert_relative_eq!(rates[19], 10.0, max_relative = 1e-12);
        assert!(rates.windows(2).all(|pair| pair[0] < pair[1]));

        // constant ratio between neighbours
        let ratio = rates[1] / rates[0];
        for pair in rates.windows(2) {
            assert_relative_eq!(pair[1] / pair[0], ratio, max_relative = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_range_finder_schedule_single_step() -> Result<(), TrainingError> {
        assert_eq!(range_finder_exponents(1e-3, 1.0, 1)?, vec![-3.0]);
        Ok(())
    }

    #[test]
    fn test_range_finder_schedule_preconditions() {
        assert!(range_finder_schedule(1e-5, 10.0, 0).is_err());
        assert!(range_finder_schedule(0.0, 10.0, 5).is_err());
        assert!(range_finder_schedule(1.0, 0.5, 5).is_err());
    }
}
