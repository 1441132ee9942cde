//! Network configuration that can be stored as JSON.
//!
//! ```json
//! {
//!   "batch_size": 16,
//!   "input": 2,
//!   "layers": [
//!     { "kind": "dense", "out": 8 },
//!     { "kind": "tanh" },
//!     { "kind": "dense", "out": 1 }
//!   ]
//! }
//! ```
//!
//! Element-wise layers may leave `out` unset, it then matches the previous layer's width.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::initializer::Initializer;
use crate::layers::LayerKind;
use crate::network::{LinearBuilder, Network};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub batch_size: usize,
    /// Width of a single input sample.
    pub input: usize,
    pub layers: Vec<LayerConfig>,
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn builder(&self) -> LinearBuilder {
        let mut builder = LinearBuilder::new(self.batch_size, self.input);
        for layer in &self.layers {
            builder = match layer.out {
                Some(out) => builder.layer(layer.kind, out),
                None if layer.kind.is_elementwise() => builder.activation(layer.kind),
                // an unsized parameterized layer fails allocation
                None => builder.layer(layer.kind, 0),
            };
        }
        builder
    }

    /// Appends every configured layer and initializes the network.
    pub fn build(&self) -> Result<Network, Error> {
        self.builder().build()
    }

    /// Like [build](Self::build) but with a custom weight initializer.
    pub fn build_with<I>(&self, init: I) -> Result<Network, Error>
    where
        I: Initializer + 'static,
    {
        self.builder().initializer(init).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerParams;

    const CONFIG: &str = r#"{
        "batch_size": 4,
        "input": 2,
        "layers": [
            { "kind": "dense", "out": 8 },
            { "kind": "relu" },
            { "kind": "dense", "out": 1 },
            { "kind": "sigmoid", "out": 1 }
        ]
    }"#;

    #[test]
    fn parse_and_build() {
        let config = NetworkConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.layers.len(), 4);
        assert_eq!(config.layers[1].out, None);

        let net = config.build().unwrap();
        assert_eq!(net.size(), 4);
        assert_eq!(
            net.layer(1).unwrap().params(),
            &LayerParams::new(LayerKind::ReLU, 4, 8, 8)
        );
        assert_eq!(net.out_size(), Some(1));
    }

    #[test]
    fn json_round_trip() {
        let config = NetworkConfig::from_json(CONFIG).unwrap();
        let again = NetworkConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = r#"{ "batch_size": 1, "input": 1, "layers": [{ "kind": "conv" }] }"#;
        assert!(NetworkConfig::from_json(json).is_err());
    }

    #[test]
    fn dense_without_width_fails() {
        let json = r#"{ "batch_size": 1, "input": 1, "layers": [{ "kind": "dense" }] }"#;
        let config = NetworkConfig::from_json(json).unwrap();
        assert!(matches!(config.build(), Err(Error::InvalidShape { .. })));
    }
}
