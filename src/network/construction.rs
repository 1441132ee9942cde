use super::Network;
use crate::{
    error::Error,
    initializer::{Initializer, Xavier},
    layers::{LayerKind, LayerParams},
};

/// Builder for networks where all layers have only a single input and output.
/// `build` appends every layer and initializes the network.
pub struct LinearBuilder {
    batch_size: usize,
    in_size: usize,
    layers: Vec<(LayerKind, usize)>,
    init: Box<dyn Initializer>,
}

impl LinearBuilder {
    pub fn new(batch_size: usize, in_size: usize) -> Self {
        LinearBuilder {
            batch_size,
            in_size,
            layers: Vec::new(),
            init: Box::new(Xavier::new()),
        }
    }

    fn last_out_size(&self) -> usize {
        self.layers.last().map_or(self.in_size, |(_, out)| *out)
    }

    /// Adds a single layer producing `out_size` values per sample.
    pub fn layer(mut self, kind: LayerKind, out_size: usize) -> Self {
        self.layers.push((kind, out_size));
        self
    }

    /// Adds an element-wise layer as wide as the previous one.
    pub fn activation(self, kind: LayerKind) -> Self {
        let out_size = self.last_out_size();
        self.layer(kind, out_size)
    }

    /// Adds all of the provided layers.
    pub fn layers<T>(mut self, layers: T) -> Self
    where
        T: IntoIterator<Item = (LayerKind, usize)>,
    {
        for (kind, out_size) in layers {
            self = self.layer(kind, out_size);
        }
        self
    }

    /// Sets the initializer used for the weights of parameterized layers.
    pub fn initializer<I>(mut self, init: I) -> Self
    where
        I: Initializer + 'static,
    {
        self.init = Box::new(init);
        self
    }

    /// Builds and initializes the network. Fails with [Error::Empty] if no layers had been provided.
    pub fn build(mut self) -> Result<Network, Error> {
        let mut network = Network::new();
        let mut layers = self.layers.iter();
        let (kind, out_size) = layers.next().ok_or(Error::Empty)?;
        network.append(LayerParams::new(
            *kind,
            self.batch_size,
            self.in_size,
            *out_size,
        ))?;
        for (kind, out_size) in layers {
            network.append(LayerParams {
                kind: *kind,
                out_size: *out_size,
                ..Default::default()
            })?;
        }
        network.init_with(self.init.as_mut())?;
        Ok(network)
    }
}
