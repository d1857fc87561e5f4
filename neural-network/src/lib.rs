// Modules
mod activations;
mod adam;
mod error;
mod layer;
mod module;
mod network;
mod network_config;
mod optimizer;
mod parameter;
mod sgd;

pub use activations::ActivationType;
pub use adam::{Adam, AdamBuilder};
pub use error::NetworkError;
pub use layer::Layer;
pub use matrix::Matrix;
pub use module::{Mode, Module, Parameterized};
pub use network::{LayerGroup, Network};
pub use network_config::{GroupConfig, LayerConfig, NetworkConfig};
pub use optimizer::{Optimizer, OptimizerBuilder};
pub use parameter::Parameter;
pub use sgd::{Sgd, SgdBuilder};
