mod data;
mod error;
mod evaluate;
mod freeze;
mod loss;
mod metrics;
mod observer;
mod persist;
mod predict;
mod range_finder;
mod schedule;
mod smoothing;
mod training;
mod training_config;
mod training_history;
mod triangular;

pub use data::{Batch, DataLoader, Dataset, InMemoryLoader};
pub use error::TrainingError;
pub use evaluate::evaluate;
pub use freeze::{set_trainable, unfreeze};
pub use loss::{BceWithLogits, Loss, LossValue, MeanSquaredError};
pub use metrics::{Accuracy, F1, Metric, MetricResult, Precision, Recall, VAL_LOSS};
pub use observer::{ProgressObserver, QuietObserver, TrainingObserver, format_duration};
pub use persist::{StateDict, load_model, save_model};
pub use predict::{predict, predict_with_labels};
pub use range_finder::{DIVERGENCE_FACTOR, RangeFinderOutcome, RangeFinderResult};
pub use schedule::{
    MOMENTUM_HIGH, MOMENTUM_LOW, TriangularSchedule, range_finder_schedule, triangular_schedule,
};
pub use smoothing::{BestLoss, RunningLoss};
pub use training::Trainer;
pub use training_config::{
    LoopConfig, LoopConfigBuilder, RangeFinderConfig, RangeFinderConfigBuilder, TrainingConfig,
    TriangularConfig, TriangularConfigBuilder,
};
pub use training_history::{EpochSummary, TrainingHistory};

/// Group that [`unfreeze`] targets in the binary classifier layout.
pub const TOP_MODEL_GROUP: &str = "top_model";

pub mod prelude {
    pub use crate::{
        Accuracy, BceWithLogits, DataLoader, Dataset, InMemoryLoader, LoopConfig, Metric,
        ProgressObserver, RangeFinderConfig, Trainer, TrainingConfig, TrainingError,
        TrainingHistory, TriangularConfig,
    };
}
