use neural_network::NetworkError;
use thiserror::Error;

/// Errors that can occur while scheduling, training, evaluating or persisting a model
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Failure reported by the model or one of its layers
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Wrapper for standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Schedule parameters outside their valid range
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
    /// A data loader produced no examples where at least one is required
    #[error("Data loader '{0}' yielded no examples")]
    EmptyDataset(&'static str),
    /// Inputs and labels, or predictions and labels, disagree in length
    #[error("Data mismatch: {0}")]
    DataMismatch(String),
    /// Output and target shapes differ
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// The model has no layer group with this name
    #[error("Model has no layer group named '{group_id}'")]
    MissingGroup { group_id: String },
    /// Layer index past the end of its group
    #[error("Layer index {index} out of range for group of {len} layers")]
    LayerIndexOutOfRange { index: usize, len: usize },
    /// A saved state does not fit the model it is loaded into
    #[error("State mismatch: {0}")]
    StateMismatch(String),
}
