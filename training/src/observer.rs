//! Progress reporting hooks for the training drivers.

use crate::training_history::EpochSummary;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Receives progress from a driver. Purely cosmetic: nothing here can
/// influence training.
pub trait TrainingObserver {
    /// Called once before the first batch.
    fn on_start(&mut self, _epochs: usize, _batches_per_epoch: usize) {}

    /// Called after every batch with the global step (1-based), the total
    /// number of steps and the current epoch (1-based).
    fn on_batch_end(&mut self, _step: usize, _total_steps: usize, _epoch: usize) {}

    fn on_epoch_end(&mut self, summary: &EpochSummary) {
        println!("{summary}");
    }

    /// Called when a timed driver completes; `elapsed` is its wall-clock time.
    fn on_finish(&mut self, elapsed: Duration) {
        println!("Total training time: {}", format_duration(elapsed));
    }

    /// Called when an untimed driver stops, whatever the reason.
    fn on_stop(&mut self) {}
}

/// Prints summaries and timing, draws no progress bars.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuietObserver;

impl TrainingObserver for QuietObserver {}

/// Console observer with nested epoch and batch progress bars.
#[derive(Debug, Default)]
pub struct ProgressObserver {
    bars: Option<Bars>,
}

#[derive(Debug)]
struct Bars {
    multi: MultiProgress,
    epoch: ProgressBar,
    batch: ProgressBar,
    batches_per_epoch: usize,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear(&mut self) {
        if let Some(bars) = self.bars.take() {
            bars.batch.finish_and_clear();
            bars.epoch.finish_and_clear();
        }
    }
}

impl TrainingObserver for ProgressObserver {
    fn on_start(&mut self, epochs: usize, batches_per_epoch: usize) {
        self.clear();
        let multi = MultiProgress::new();
        let epoch = multi.add(ProgressBar::new(epochs as u64));
        let batch = multi.add(ProgressBar::new(batches_per_epoch as u64));
        epoch.set_style(create_progress_style(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} Epoch {msg}",
        ));
        batch.set_style(create_progress_style(
            "{spinner:.yellow} [{elapsed_precise}] {bar:40.yellow/blue} {pos:>7}/{len:7} Batch {msg}",
        ));
        self.bars = Some(Bars {
            multi,
            epoch,
            batch,
            batches_per_epoch,
        });
    }

    fn on_batch_end(&mut self, step: usize, _total_steps: usize, epoch: usize) {
        if let Some(bars) = &self.bars {
            let position = match bars.batches_per_epoch {
                0 => 0,
                n => step.saturating_sub(1) % n + 1,
            };
            bars.batch.set_position(position as u64);
            bars.batch.set_message(format!("in Epoch {epoch}"));
            if position == bars.batches_per_epoch {
                bars.epoch.set_position(epoch as u64);
            }
        }
    }

    fn on_epoch_end(&mut self, summary: &EpochSummary) {
        match &self.bars {
            Some(bars) => {
                bars.multi.suspend(|| println!("{summary}"));
                bars.epoch.set_message(format!("- Train loss: {:.4}", summary.train_loss));
            }
            None => println!("{summary}"),
        }
    }

    fn on_finish(&mut self, elapsed: Duration) {
        self.clear();
        println!("Total training time: {}", format_duration(elapsed));
    }

    fn on_stop(&mut self) {
        self.clear();
    }
}

fn create_progress_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// Formats a duration as `1h 2m 3s`, omitting leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(400)), "0s");
        assert_eq!(format_duration(Duration::from_secs(59)), "59s");
        assert_eq!(format_duration(Duration::from_secs(3600 + 120)), "1h 2m");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 2m 3s");
    }

    #[test]
    fn test_progress_observer_without_start_is_harmless() {
        let mut observer = ProgressObserver::new();
        observer.on_batch_end(1, 10, 1);
        observer.on_finish(Duration::from_secs(1));
    }
}
