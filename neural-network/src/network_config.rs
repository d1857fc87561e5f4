use crate::activations::ActivationType;
use crate::error::NetworkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Architecture of a feed-forward network.
///
/// Layers are organised in named groups (for example a pretrained `body` and
/// a `top_model` head) so that training code can freeze or unfreeze them by
/// name.
///
/// # Example
///
/// ```
/// use neural_network::NetworkConfig;
///
/// let config = NetworkConfig::binary_classifier(4);
/// assert_eq!(config.inputs, 4);
/// assert_eq!(config.outputs(), Some(1));
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Number of input features.
    pub inputs: usize,

    /// Layer groups in forward order.
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GroupConfig {
    pub name: String,
    pub layers: Vec<LayerConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LayerConfig {
    /// Number of nodes (neurons) in this layer.
    pub nodes: usize,

    /// Activation applied to the layer output. Defaults to identity.
    #[serde(default)]
    pub activation: ActivationType,

    /// Dropout rate applied in training mode.
    #[serde(default)]
    pub dropout: f64,
}

impl LayerConfig {
    pub fn new(nodes: usize, activation: ActivationType) -> Self {
        Self {
            nodes,
            activation,
            dropout: 0.0,
        }
    }
}

impl NetworkConfig {
    /// Two ReLU layers in a `body` group followed by a single-logit `top_model`.
    pub fn binary_classifier(inputs: usize) -> Self {
        Self {
            inputs,
            groups: vec![
                GroupConfig {
                    name: "body".to_string(),
                    layers: vec![
                        LayerConfig::new(16, ActivationType::Relu),
                        LayerConfig::new(8, ActivationType::Relu),
                    ],
                },
                GroupConfig {
                    name: "top_model".to_string(),
                    layers: vec![LayerConfig::new(1, ActivationType::Identity)],
                },
            ],
        }
    }

    /// Loads a network configuration from a JSON file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use neural_network::NetworkConfig;
    /// use std::path::Path;
    ///
    /// let config = NetworkConfig::load(Path::new("network.json")).unwrap();
    /// ```
    pub fn load(path: &Path) -> Result<Self, NetworkError> {
        let config_str = fs::read_to_string(path)?;
        let config: NetworkConfig = serde_json::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.inputs == 0 {
            return Err(NetworkError::InvalidConfig(
                "network must have at least one input".to_string(),
            ));
        }
        if self.groups.iter().all(|group| group.layers.is_empty()) {
            return Err(NetworkError::InvalidConfig(
                "network must have at least one layer".to_string(),
            ));
        }
        for group in &self.groups {
            for layer in &group.layers {
                if layer.nodes == 0 {
                    return Err(NetworkError::InvalidConfig(format!(
                        "layer in group '{}' has no nodes",
                        group.name
                    )));
                }
                if !(0.0..1.0).contains(&layer.dropout) {
                    return Err(NetworkError::InvalidConfig(format!(
                        "dropout {} in group '{}' must be in [0, 1)",
                        layer.dropout, group.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Width of the final layer.
    pub fn outputs(&self) -> Option<usize> {
        self.groups
            .iter()
            .flat_map(|group| group.layers.iter())
            .last()
            .map(|layer| layer.nodes)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::binary_classifier(2)
    }
}

impl fmt::Display for NetworkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network configuration ({} inputs):", self.inputs)?;
        for group in &self.groups {
            writeln!(f, "  {}:", group.name)?;
            for layer in &group.layers {
                writeln!(
                    f,
                    "    {} nodes, {:?}, dropout {}",
                    layer.nodes, layer.activation, layer.dropout
                )?;
            }
        }
        Ok(())
    }
}
