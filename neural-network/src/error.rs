use thiserror::Error;

/// Errors raised by modules, layers and network persistence.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// A matrix handed to a layer does not have the shape the layer expects
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Backward pass requested before a training-mode forward pass
    #[error("No cached activations: run a forward pass in training mode before backward")]
    MissingActivations,
    /// Rejected network configuration
    #[error("Invalid network configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper for standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
