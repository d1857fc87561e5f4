//! Datasets and the batch iterators the drivers consume.

use crate::error::TrainingError;
use matrix::Matrix;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// One batch: an input row per example and the matching labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<f64>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in column form, one row per example.
    pub fn targets(&self) -> Matrix {
        Matrix::column(&self.labels)
    }
}

/// A finite, restartable source of batches.
pub trait DataLoader {
    /// Batches per pass.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a fresh pass over the data.
    fn batches(&self) -> Box<dyn Iterator<Item = Batch> + '_>;
}

/// Examples held in memory, one input row per label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredDataset", into = "StoredDataset")]
pub struct Dataset {
    inputs: Matrix,
    labels: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct StoredDataset {
    inputs: Vec<Vec<f64>>,
    labels: Vec<f64>,
}

impl TryFrom<StoredDataset> for Dataset {
    type Error = TrainingError;

    fn try_from(stored: StoredDataset) -> Result<Self, Self::Error> {
        let inputs = Matrix::from_rows(&stored.inputs)
            .ok_or_else(|| TrainingError::DataMismatch("ragged input rows".to_string()))?;
        Dataset::new(inputs, stored.labels)
    }
}

impl From<Dataset> for StoredDataset {
    fn from(dataset: Dataset) -> Self {
        let cols = dataset.inputs.cols();
        let inputs = if cols == 0 {
            Vec::new()
        } else {
            dataset
                .inputs
                .to_vec()
                .chunks(cols)
                .map(<[f64]>::to_vec)
                .collect()
        };
        Self {
            inputs,
            labels: dataset.labels,
        }
    }
}

impl Dataset {
    pub fn new(inputs: Matrix, labels: Vec<f64>) -> Result<Self, TrainingError> {
        if inputs.rows() != labels.len() {
            return Err(TrainingError::DataMismatch(format!(
                "{} input rows but {} labels",
                inputs.rows(),
                labels.len()
            )));
        }
        Ok(Self { inputs, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> usize {
        self.inputs.cols()
    }

    pub fn inputs(&self) -> &Matrix {
        &self.inputs
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Examples at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Result<Self, TrainingError> {
        let out_of_range = || {
            TrainingError::DataMismatch(format!(
                "subset index out of range for {} examples",
                self.len()
            ))
        };
        let inputs = self.inputs.select_rows(indices).ok_or_else(out_of_range)?;
        let labels = indices
            .iter()
            .map(|&i| self.labels.get(i).copied())
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(out_of_range)?;
        Ok(Self { inputs, labels })
    }

    /// Shuffles the examples and splits off `fraction` of them for validation.
    pub fn split(&self, fraction: f64) -> Result<(Self, Self), TrainingError> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut rand::rng());
        let held_out = ((self.len() as f64) * fraction.clamp(0.0, 1.0)).round() as usize;
        let (valid, train) = indices.split_at(held_out.min(indices.len()));
        Ok((self.subset(train)?, self.subset(valid)?))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrainingError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrainingError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }
}

/// Chunks a [`Dataset`] into batches, optionally reshuffling on every pass.
#[derive(Debug, Clone)]
pub struct InMemoryLoader {
    dataset: Dataset,
    batch_size: usize,
    shuffle: bool,
}

impl InMemoryLoader {
    pub fn new(dataset: Dataset, batch_size: usize, shuffle: bool) -> Result<Self, TrainingError> {
        if batch_size == 0 {
            return Err(TrainingError::DataMismatch(
                "batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dataset,
            batch_size,
            shuffle,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl DataLoader for InMemoryLoader {
    fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    fn batches(&self) -> Box<dyn Iterator<Item = Batch> + '_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(&mut rand::rng());
        }
        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect();
        // chunks only hold row indices of this dataset
        Box::new(chunks.into_iter().filter_map(move |chunk| {
            let Dataset { inputs, labels } = self.dataset.subset(&chunk).ok()?;
            Some(Batch { inputs, labels })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix::matrix;
    use tempfile::tempdir;

    fn dataset(examples: usize) -> Dataset {
        let inputs = Matrix::from_shape_vec(
            examples,
            2,
            (0..examples * 2).map(|value| value as f64).collect(),
        )
        .unwrap();
        let labels = (0..examples).map(|i| (i % 2) as f64).collect();
        Dataset::new(inputs, labels).unwrap()
    }

    #[test]
    fn test_dataset_rejects_mismatched_labels() {
        let result = Dataset::new(matrix![1.0, 2.0; 3.0, 4.0], vec![1.0]);
        assert!(matches!(result, Err(TrainingError::DataMismatch(_))));
    }

    #[test]
    fn test_loader_batch_sizes() -> Result<(), TrainingError> {
        let loader = InMemoryLoader::new(dataset(8), 5, false)?;
        assert_eq!(loader.len(), 2);

        let sizes: Vec<usize> = loader.batches().map(|batch| batch.len()).collect();
        assert_eq!(sizes, vec![5, 3]);

        let last = loader.batches().last().unwrap();
        assert_eq!(last.inputs, matrix![10.0, 11.0; 12.0, 13.0; 14.0, 15.0]);
        assert_eq!(last.targets().shape(), (3, 1));
        Ok(())
    }

    #[test]
    fn test_shuffled_pass_keeps_every_example() -> Result<(), TrainingError> {
        let loader = InMemoryLoader::new(dataset(10), 3, true)?;
        let mut firsts: Vec<f64> = loader
            .batches()
            .flat_map(|batch| batch.inputs.to_vec().into_iter().step_by(2).collect::<Vec<_>>())
            .collect();
        firsts.sort_by(f64::total_cmp);
        let expected: Vec<f64> = (0..10).map(|i| (2 * i) as f64).collect();
        assert_eq!(firsts, expected);
        Ok(())
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(InMemoryLoader::new(dataset(4), 0, false).is_err());
    }

    #[test]
    fn test_split_partitions_examples() -> Result<(), TrainingError> {
        let (train, valid) = dataset(10).split(0.2)?;
        assert_eq!(train.len(), 8);
        assert_eq!(valid.len(), 2);
        assert_eq!(train.features(), 2);
        Ok(())
    }

    #[test]
    fn test_subset_selects_rows_in_order() -> Result<(), TrainingError> {
        let picked = dataset(4).subset(&[3, 1])?;
        assert_eq!(picked.inputs(), &matrix![6.0, 7.0; 2.0, 3.0]);
        assert_eq!(picked.labels(), &[1.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_subset_rejects_out_of_range_index() -> Result<(), TrainingError> {
        let dataset = Dataset::new(Matrix::zeros(2, 1), vec![0.0, 1.0])?;
        assert!(matches!(
            dataset.subset(&[5]),
            Err(TrainingError::DataMismatch(_))
        ));
        assert!(matches!(
            dataset.subset(&[0, 2]),
            Err(TrainingError::DataMismatch(_))
        ));
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<(), TrainingError> {
        let dir = tempdir()?;
        let path = dir.path().join("data").join("set.json");
        let original = dataset(3);
        original.save(&path)?;
        assert_eq!(Dataset::load(&path)?, original);
        Ok(())
    }
}
