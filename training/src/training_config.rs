use crate::error::TrainingError;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Settings for the learning-rate range finder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct RangeFinderConfig {
    /// First learning rate of the sweep
    pub low_rate: f64,
    /// Last learning rate of the sweep
    pub high_rate: f64,
    /// Smoothing factor of the running loss
    pub beta: f64,
    /// Passes over the training loader
    pub epochs: usize,
    /// L2 weight decay handed to every optimizer the sweep builds
    pub weight_decay: f64,
    /// Where the parameters are saved before the sweep
    #[builder(setter(into))]
    pub snapshot_path: PathBuf,
}

impl Default for RangeFinderConfig {
    fn default() -> Self {
        Self {
            low_rate: 1e-5,
            high_rate: 10.0,
            beta: 0.98,
            epochs: 1,
            weight_decay: 5e-4,
            snapshot_path: PathBuf::from("models/tmp.json"),
        }
    }
}

/// Settings for one triangular-policy run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct TriangularConfig {
    pub low_rate: f64,
    pub high_rate: f64,
    pub epochs: usize,
    /// Fraction of all steps spent in each of the rising and falling halves
    pub half_cycle_pct: f64,
}

impl Default for TriangularConfig {
    fn default() -> Self {
        Self {
            low_rate: 1e-5,
            high_rate: 0.01,
            epochs: 4,
            half_cycle_pct: 0.45,
        }
    }
}

/// Settings for the outer loop that repeats triangular runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct LoopConfig {
    /// Number of triangular runs
    pub steps: usize,
    pub low_rate: f64,
    pub high_rate: f64,
    /// Epochs per triangular run
    pub epochs: usize,
    pub half_cycle_pct: f64,
}

impl LoopConfig {
    /// Settings of each inner run.
    pub fn triangular(&self) -> TriangularConfig {
        TriangularConfig {
            low_rate: self.low_rate,
            high_rate: self.high_rate,
            epochs: self.epochs,
            half_cycle_pct: self.half_cycle_pct,
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            steps: 3,
            low_rate: 1e-6,
            high_rate: 0.01,
            epochs: 4,
            half_cycle_pct: TriangularConfig::default().half_cycle_pct,
        }
    }
}

/// Everything a training session needs besides the model and the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Size of each training batch
    pub batch_size: usize,
    /// Reshuffle the training examples on every pass
    pub shuffle: bool,
    pub range_finder: RangeFinderConfig,
    pub triangular: TriangularConfig,
    pub training_loop: LoopConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            shuffle: true,
            range_finder: RangeFinderConfig::default(),
            triangular: TriangularConfig::default(),
            training_loop: LoopConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Reads a JSON configuration; missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainingError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
