//! Learning-rate range finder.
//!
//! Sweeps the learning rate upwards on a log scale, one value per batch,
//! and records the raw and smoothed training loss. The sweep stops early
//! once the smoothed loss exceeds four times the best smoothed loss seen.

use crate::data::DataLoader;
use crate::error::TrainingError;
use crate::loss::Loss;
use crate::persist::{load_model, save_model};
use crate::schedule::range_finder_exponents;
use crate::smoothing::{BestLoss, RunningLoss};
use crate::training::Trainer;
use crate::training_config::RangeFinderConfig;
use neural_network::{Mode, Module, OptimizerBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// The sweep stops once the smoothed loss exceeds this multiple of the best one.
pub const DIVERGENCE_FACTOR: f64 = 4.0;

/// How a sweep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeFinderOutcome {
    /// Every scheduled rate was tried; the parameters were restored.
    Exhausted,
    /// The smoothed loss blew up at `step` (1-based). Results stop before
    /// that step and the parameters are left as the sweep made them.
    Diverged { step: usize },
}

/// Equal-length series collected by a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFinderResult {
    /// `log10` of the learning rate used at each step
    pub log_rates: Vec<f64>,
    pub losses: Vec<f64>,
    pub smoothed_losses: Vec<f64>,
    pub outcome: RangeFinderOutcome,
}

impl RangeFinderResult {
    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn diverged(&self) -> bool {
        matches!(self.outcome, RangeFinderOutcome::Diverged { .. })
    }

    /// Learning rate at the lowest smoothed loss.
    pub fn min_loss_rate(&self) -> Option<f64> {
        self.smoothed_losses
            .iter()
            .zip(&self.log_rates)
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, log_rate)| 10f64.powf(*log_rate))
    }
}

impl<M, L, B> Trainer<M, L, B>
where
    M: Module,
    L: Loss,
    B: OptimizerBuilder,
{
    /// Runs a learning-rate sweep over `config.epochs` passes of `train`.
    ///
    /// The parameters are saved to `config.snapshot_path` first and loaded
    /// back only if the sweep runs to the end. A fresh optimizer is built for
    /// every batch, so nothing but the rate carries over between steps.
    pub fn find_learning_rate<D>(
        &mut self,
        train: &D,
        config: &RangeFinderConfig,
    ) -> Result<RangeFinderResult, TrainingError>
    where
        D: DataLoader + ?Sized,
    {
        let batches_per_epoch = train.len();
        if batches_per_epoch == 0 {
            return Err(TrainingError::EmptyDataset("training"));
        }
        let mut log_rates = range_finder_exponents(
            config.low_rate,
            config.high_rate,
            config.epochs * batches_per_epoch,
        )?;
        let total_steps = log_rates.len();
        let mut running = RunningLoss::new(config.beta)?;

        save_model(&self.model, &config.snapshot_path)?;
        self.model.set_mode(Mode::Train);
        self.observer.on_start(config.epochs, batches_per_epoch);

        let mut best = BestLoss::default();
        let mut losses = Vec::with_capacity(total_steps);
        let mut smoothed_losses = Vec::with_capacity(total_steps);
        let mut step = 0;

        for epoch in 1..=config.epochs {
            for batch in train.batches() {
                let Some(&log_rate) = log_rates.get(step) else {
                    break;
                };
                step += 1;

                let rate = 10f64.powf(log_rate);
                let mut optimizer = self.optimizer.build(rate, None, config.weight_decay);
                let loss = self.forward_loss(&batch)?;
                let smoothed = running.update(loss.value);
                debug!(step, rate, loss = loss.value, smoothed, "range finder step");

                if step > 1 && best.exceeded_by(smoothed, DIVERGENCE_FACTOR) {
                    info!(step, rate, smoothed, best = ?best.get(), "loss diverged");
                    log_rates.truncate(step - 1);
                    self.observer.on_stop();
                    return Ok(RangeFinderResult {
                        log_rates,
                        losses,
                        smoothed_losses,
                        outcome: RangeFinderOutcome::Diverged { step },
                    });
                }
                best.observe(smoothed);
                losses.push(loss.value);
                smoothed_losses.push(smoothed);

                self.backward_step(&mut optimizer, &loss.gradient)?;
                self.observer.on_batch_end(step, total_steps, epoch);
            }
        }

        load_model(&mut self.model, &config.snapshot_path)?;
        log_rates.truncate(losses.len());
        info!(steps = losses.len(), "range finder exhausted the schedule");
        self.observer.on_stop();
        Ok(RangeFinderResult {
            log_rates,
            losses,
            smoothed_losses,
            outcome: RangeFinderOutcome::Exhausted,
        })
    }
}
