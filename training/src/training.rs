//! The trainer that owns a model and drives it through the training procedures.
//!
//! A [`Trainer`] bundles:
//! - the model being fitted
//! - the loss used for training and validation
//! - the optimizer builder, invoked afresh for every batch
//! - the validation metrics and a progress observer
//!
//! The procedures themselves live next door: the range finder in
//! `range_finder.rs` and the triangular policy and outer loop in
//! `triangular.rs`.

use crate::data::{Batch, DataLoader};
use crate::error::TrainingError;
use crate::evaluate::evaluate;
use crate::loss::{Loss, LossValue};
use crate::metrics::{Accuracy, Metric, MetricResult};
use crate::observer::{QuietObserver, TrainingObserver};
use crate::predict::{predict, predict_with_labels};
use matrix::Matrix;
use neural_network::{Module, Optimizer, OptimizerBuilder};

/// Trainer manages a model through range finding, triangular training and evaluation.
pub struct Trainer<M, L, B> {
    pub(crate) model: M,
    pub(crate) loss: L,
    pub(crate) optimizer: B,
    pub(crate) metrics: Vec<Box<dyn Metric>>,
    pub(crate) observer: Box<dyn TrainingObserver>,
}

impl<M, L, B> Trainer<M, L, B>
where
    M: Module,
    L: Loss,
    B: OptimizerBuilder,
{
    /// Creates a trainer reporting `accuracy_score` and printing summaries without progress bars.
    pub fn new(model: M, loss: L, optimizer: B) -> Self {
        Self {
            model,
            loss,
            optimizer,
            metrics: vec![Box::new(Accuracy)],
            observer: Box::new(QuietObserver),
        }
    }

    /// Replaces the validation metrics.
    pub fn with_metrics(mut self, metrics: Vec<Box<dyn Metric>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: TrainingObserver + 'static,
    {
        self.observer = Box::new(observer);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access, e.g. to freeze or unfreeze layers between runs.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(|metric| metric.name()).collect()
    }

    /// Validation loss and metrics of the current model.
    pub fn evaluate<D>(&mut self, valid: &D) -> Result<MetricResult, TrainingError>
    where
        D: DataLoader + ?Sized,
    {
        evaluate(&mut self.model, valid, &self.loss, &self.metrics)
    }

    pub fn predict<D>(&mut self, loader: &D) -> Result<Vec<bool>, TrainingError>
    where
        D: DataLoader + ?Sized,
    {
        predict(&mut self.model, loader)
    }

    pub fn predict_with_labels<D>(
        &mut self,
        loader: &D,
    ) -> Result<(Vec<bool>, Vec<f64>), TrainingError>
    where
        D: DataLoader + ?Sized,
    {
        predict_with_labels(&mut self.model, loader)
    }

    pub(crate) fn forward_loss(&mut self, batch: &Batch) -> Result<LossValue, TrainingError> {
        let output = self.model.forward(&batch.inputs)?;
        self.loss.compute(&output, &batch.targets())
    }

    /// Zeroes the gradients, backpropagates `gradient` and applies one optimizer step.
    pub(crate) fn backward_step(
        &mut self,
        optimizer: &mut B::Optimizer,
        gradient: &Matrix,
    ) -> Result<(), TrainingError> {
        optimizer.zero_grad(&mut self.model.parameters_mut());
        self.model.backward(gradient)?;
        optimizer.step(&mut self.model.parameters_mut())?;
        Ok(())
    }
}
