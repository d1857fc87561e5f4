use crate::error::NetworkError;
use crate::layer::Layer;
use crate::module::{Mode, Module, Parameterized};
use crate::network_config::NetworkConfig;
use crate::parameter::Parameter;
use matrix::Matrix;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A named, ordered run of layers inside a [`Network`].
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LayerGroup {
    name: String,
    layers: Vec<Layer>,
}

impl LayerGroup {
    pub fn new(name: impl Into<String>, layers: Vec<Layer>) -> Self {
        Self {
            name: name.into(),
            layers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

/// A feed-forward network made of dense layers grouped by name.
///
/// The network maps a batch (one example per row) to raw outputs. Gradients
/// are produced by [`Module::backward`] from the gradient of a loss with
/// respect to those outputs.
///
/// # Examples
///
/// ```
/// use matrix::matrix;
/// use neural_network::{Module, Network, NetworkConfig};
///
/// let mut network = Network::new(&NetworkConfig::binary_classifier(2));
/// let logits = network.forward(&matrix![0.5, -0.5]).unwrap();
/// assert_eq!(logits.shape(), (1, 1));
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Network {
    inputs: usize,
    groups: Vec<LayerGroup>,
    #[serde(skip)]
    mode: Mode,
}

impl Network {
    /// Creates a randomly initialised network from `config`.
    pub fn new(config: &NetworkConfig) -> Self {
        let mut width = config.inputs;
        let groups = config
            .groups
            .iter()
            .map(|group| {
                let layers = group
                    .layers
                    .iter()
                    .map(|layer| {
                        let built = Layer::new(width, layer.nodes, layer.activation, layer.dropout);
                        width = layer.nodes;
                        built
                    })
                    .collect();
                LayerGroup::new(group.name.clone(), layers)
            })
            .collect();

        Self {
            inputs: config.inputs,
            groups,
            mode: Mode::Train,
        }
    }

    /// Assembles a network from prebuilt groups, checking that widths chain.
    pub fn from_groups(inputs: usize, groups: Vec<LayerGroup>) -> Result<Self, NetworkError> {
        let mut width = inputs;
        for layer in groups.iter().flat_map(|group| group.layers.iter()) {
            if layer.inputs() != width {
                return Err(NetworkError::ShapeMismatch {
                    context: "layer chaining",
                    expected: (width, layer.nodes()),
                    actual: (layer.inputs(), layer.nodes()),
                });
            }
            width = layer.nodes();
        }
        Ok(Self {
            inputs,
            groups,
            mode: Mode::Train,
        })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn groups(&self) -> &[LayerGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&LayerGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Saves the network, architecture and weights, as JSON.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use neural_network::{Network, NetworkConfig};
    ///
    /// let network = Network::new(&NetworkConfig::default());
    /// network.save("models/trained_network.json").unwrap();
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads a network saved with [`Network::save`]. The network starts in train mode.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let json = fs::read_to_string(path)?;
        let network: Network = serde_json::from_str(&json)?;
        Self::from_groups(network.inputs, network.groups)
    }

    fn layers_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Layer> {
        self.groups.iter_mut().flat_map(|group| group.layers.iter_mut())
    }
}

impl Parameterized for Network {
    fn parameters(&self) -> Vec<&Parameter> {
        self.groups
            .iter()
            .flat_map(|group| group.layers.iter())
            .flat_map(|layer| layer.parameters())
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.layers_mut()
            .flat_map(|layer| layer.parameters_mut())
            .collect()
    }
}

impl Module for Network {
    type Layer = Layer;

    fn forward(&mut self, inputs: &Matrix) -> Result<Matrix, NetworkError> {
        if inputs.cols() != self.inputs {
            return Err(NetworkError::ShapeMismatch {
                context: "network input",
                expected: (inputs.rows(), self.inputs),
                actual: inputs.shape(),
            });
        }

        let mode = self.mode;
        let mut current = inputs.clone();
        for layer in self.layers_mut() {
            current = layer.forward(&current, mode)?;
        }
        Ok(current)
    }

    fn backward(&mut self, grad_output: &Matrix) -> Result<(), NetworkError> {
        let mut grad = grad_output.clone();
        for layer in self.layers_mut().rev() {
            grad = layer.backward(&grad)?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn group_mut(&mut self, group_id: &str) -> Option<&mut [Layer]> {
        self.groups
            .iter_mut()
            .find(|group| group.name == group_id)
            .map(|group| group.layers.as_mut_slice())
    }
}
