use crate::data::DataLoader;
use crate::error::TrainingError;
use crate::evaluate::evaluate;
use crate::loss::Loss;
use crate::schedule::triangular_schedule;
use crate::training::Trainer;
use crate::training_config::{LoopConfig, TriangularConfig};
use crate::training_history::{EpochSummary, TrainingHistory};
use neural_network::{Mode, Module, OptimizerBuilder};
use std::time::Instant;
use tracing::{debug, info};

impl<M, L, B> Trainer<M, L, B>
where
    M: Module,
    L: Loss,
    B: OptimizerBuilder,
{
    /// Trains for `config.epochs` epochs under the triangular policy.
    ///
    /// Every batch gets a freshly built optimizer carrying that step's
    /// learning rate and momentum, with weight decay off. After each epoch
    /// the validation set is evaluated and a one-line summary is reported.
    pub fn train_triangular_policy<T, V>(
        &mut self,
        train: &T,
        valid: &V,
        config: &TriangularConfig,
    ) -> Result<TrainingHistory, TrainingError>
    where
        T: DataLoader + ?Sized,
        V: DataLoader + ?Sized,
    {
        let started = Instant::now();
        let batches_per_epoch = train.len();
        if batches_per_epoch == 0 {
            return Err(TrainingError::EmptyDataset("training"));
        }
        let total_steps = config.epochs * batches_per_epoch;
        let schedule = triangular_schedule(
            config.low_rate,
            config.high_rate,
            total_steps,
            config.half_cycle_pct,
        )?;

        self.observer.on_start(config.epochs, batches_per_epoch);
        let mut history = TrainingHistory::new();
        let mut step = 0;

        for epoch in 1..=config.epochs {
            self.model.set_mode(Mode::Train);
            let mut sum_loss = 0.0;
            let mut total = 0usize;

            for batch in train.batches() {
                let Some((rate, momentum)) = schedule.get(step) else {
                    break;
                };
                step += 1;

                let mut optimizer = self.optimizer.build(rate, Some(momentum), 0.0);
                let loss = self.forward_loss(&batch)?;
                self.backward_step(&mut optimizer, &loss.gradient)?;

                sum_loss += batch.len() as f64 * loss.value;
                total += batch.len();
                debug!(step, rate, momentum, loss = loss.value, "triangular step");
                self.observer.on_batch_end(step, total_steps, epoch);
            }

            if total == 0 {
                return Err(TrainingError::EmptyDataset("training"));
            }
            let metrics = evaluate(&mut self.model, valid, &self.loss, &self.metrics)?;
            let summary = EpochSummary {
                epoch,
                train_loss: sum_loss / total as f64,
                metrics,
            };
            info!(%summary, "epoch finished");
            self.observer.on_epoch_end(&summary);
            history.record_epoch(summary);
        }

        self.observer.on_finish(started.elapsed());
        Ok(history)
    }

    /// Repeats [`Trainer::train_triangular_policy`] `config.steps` times with the
    /// same settings.
    ///
    /// Histories of the inner runs are dropped; callers that change which
    /// layers are trainable between runs use the model in between, or call the
    /// policy directly.
    pub fn training_loop<T, V>(
        &mut self,
        train: &T,
        valid: &V,
        config: &LoopConfig,
    ) -> Result<(), TrainingError>
    where
        T: DataLoader + ?Sized,
        V: DataLoader + ?Sized,
    {
        let inner = config.triangular();
        for run in 1..=config.steps {
            debug!(run, steps = config.steps, "starting triangular run");
            self.train_triangular_policy(train, valid, &inner)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freeze::{set_trainable, unfreeze};
    use crate::training::tests::{ScriptedLoss, loader, sgd_trainer};
    use crate::training_config::TriangularConfigBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn test_one_summary_per_epoch() -> Result<(), TrainingError> {
        let mut trainer = sgd_trainer(1.0, ScriptedLoss::constant(0.5));
        let config = TriangularConfigBuilder::default().epochs(3).build().unwrap();

        let history = trainer.train_triangular_policy(&loader(6, 4), &loader(4, 4), &config)?;

        assert_eq!(history.epochs.len(), 3);
        let epochs: Vec<usize> = history.epochs.iter().map(|e| e.epoch).collect();
        assert_eq!(epochs, vec![1, 2, 3]);
        for summary in &history.epochs {
            assert_relative_eq!(summary.train_loss, 0.5);
            assert_relative_eq!(summary.metrics.val_loss(), 0.5);
            assert!(summary.metrics.get("accuracy_score").is_some());
        }
        Ok(())
    }

    #[test]
    fn test_train_loss_is_batch_weighted() -> Result<(), TrainingError> {
        // training batches of 4 and 2, then one validation batch
        let loss = ScriptedLoss::new(vec![1.0, 4.0, 0.0]);
        let mut trainer = sgd_trainer(1.0, loss);
        let config = TriangularConfigBuilder::default().epochs(1).build().unwrap();

        let history = trainer.train_triangular_policy(&loader(6, 4), &loader(2, 2), &config)?;
        assert_relative_eq!(history.epochs[0].train_loss, (4.0 * 1.0 + 2.0 * 4.0) / 6.0);
        Ok(())
    }

    #[test]
    fn test_every_batch_takes_one_step_at_the_scheduled_rate() -> Result<(), TrainingError> {
        let config = TriangularConfig {
            low_rate: 0.1,
            high_rate: 0.4,
            epochs: 2,
            half_cycle_pct: 0.3,
        };
        let mut trainer = sgd_trainer(0.0, ScriptedLoss::constant(1.0));
        // 5 batches per epoch, 10 steps in total
        trainer.train_triangular_policy(&loader(5, 1), &loader(1, 1), &config)?;

        let schedule = triangular_schedule(0.1, 0.4, 10, 0.3)?;
        let expected: f64 = -schedule.rates.iter().sum::<f64>();
        assert_relative_eq!(trainer.model().weight(), expected, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_frozen_model_does_not_move() -> Result<(), TrainingError> {
        let mut trainer = sgd_trainer(0.25, ScriptedLoss::constant(1.0));
        set_trainable(trainer.model_mut(), false);
        let config = TriangularConfigBuilder::default().epochs(1).build().unwrap();
        trainer.train_triangular_policy(&loader(4, 2), &loader(2, 2), &config)?;
        assert_eq!(trainer.model().weight(), 0.25);

        unfreeze(trainer.model_mut(), 1, "top_model")?;
        assert!(trainer.model().layers[1].parameter.requires_grad());
        assert!(!trainer.model().layers[0].parameter.requires_grad());
        Ok(())
    }

    #[test]
    fn test_training_loop_repeats_the_policy() -> Result<(), TrainingError> {
        let config = LoopConfig {
            steps: 3,
            low_rate: 0.1,
            high_rate: 0.2,
            epochs: 1,
            half_cycle_pct: 0.5,
        };
        let mut trainer = sgd_trainer(0.0, ScriptedLoss::constant(1.0));
        trainer.training_loop(&loader(2, 1), &loader(1, 1), &config)?;

        // each run takes steps at 0.1 and 0.2
        assert_relative_eq!(trainer.model().weight(), -0.9, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_empty_validation_loader() {
        let mut trainer = sgd_trainer(0.0, ScriptedLoss::constant(1.0));
        let result = trainer.train_triangular_policy(
            &loader(2, 1),
            &loader(0, 1),
            &TriangularConfig::default(),
        );
        assert!(matches!(result, Err(TrainingError::EmptyDataset("validation"))));
    }

    #[test]
    fn test_unfreeze_errors() {
        let mut trainer = sgd_trainer(0.0, ScriptedLoss::constant(1.0));
        assert!(matches!(
            unfreeze(trainer.model_mut(), 2, "top_model"),
            Err(TrainingError::LayerIndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            unfreeze(trainer.model_mut(), 0, "body"),
            Err(TrainingError::MissingGroup { .. })
        ));
    }
}
