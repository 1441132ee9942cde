pub mod construction;

pub use self::construction::LinearBuilder;

use crate::error::Error;
use crate::initializer::{Initializer, Xavier};
use crate::layers::{connect, Layer, LayerParams, Weights};

use log::{debug, info, trace, warn};

/// Lifecycle of a [Network].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No layers yet.
    Empty,
    /// Layers have been appended but not allocated.
    Building,
    /// Every layer is allocated, ready for a forward pass.
    Initialized,
    /// A forward pass completed, ready for backward.
    Forwarded,
    /// A backward pass completed, gradients are ready for an update.
    Backwarded,
    /// All memory has been released.
    Freed,
}

/// A strict chain of layers. Insertion order is execution order.
///
/// Layers are only ever referred to by index, the backing storage may move when it grows.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    batch_size: usize,
    state: State,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// An empty network with a batch size of 1.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            batch_size: 1,
            state: State::Empty,
        }
    }

    pub fn size(&self) -> usize {
        self.layers.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Parameters of a single layer, None if it has none or isn't allocated.
    /// Layers themselves are never lent out mutably, so their shapes stay as appended.
    pub fn layer_weights_mut(&mut self, index: usize) -> Option<&mut Weights> {
        self.layers.get_mut(index).and_then(Layer::weights_mut)
    }

    /// The first layer, None for an empty network.
    pub fn input(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// The last layer, None for an empty network.
    pub fn output(&self) -> Option<&Layer> {
        self.layers.last()
    }

    pub fn input_index(&self) -> Option<usize> {
        if self.layers.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn output_index(&self) -> Option<usize> {
        self.layers.len().checked_sub(1)
    }

    /// Width of a single input sample.
    pub fn in_size(&self) -> Option<usize> {
        self.input().map(|l| l.params().in_size)
    }

    /// Width of a single output sample.
    pub fn out_size(&self) -> Option<usize> {
        self.output().map(|l| l.params().out_size)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    /// Number of floats owned by all layers.
    pub fn allocated_len(&self) -> usize {
        self.layers.iter().map(Layer::allocated_len).sum()
    }

    /// Adds a layer at the end of the chain and connects it to the current output layer.
    /// On failure the network is left unchanged.
    pub fn append(&mut self, params: LayerParams) -> Result<&mut Self, Error> {
        match self.state {
            State::Freed => return Err(Error::Freed),
            State::Empty | State::Building => {}
            _ => return Err(Error::Finalized),
        }

        self.layers.try_reserve(1)?;

        let mut layer = Layer::new(params);
        match self.layers.last() {
            Some(prev) => connect(prev, &mut layer),
            None => self.batch_size = params.batch_size,
        }
        debug!(
            "Appended {:?} layer {}: in {}, out {}",
            layer.kind(),
            self.layers.len(),
            layer.params().in_size,
            layer.params().out_size
        );
        self.layers.push(layer);
        self.state = State::Building;
        Ok(self)
    }

    /// Allocates every layer, initializing weights with [Xavier].
    pub fn init(&mut self) -> Result<&mut Self, Error> {
        self.init_with(&mut Xavier::new())
    }

    /// Allocates every layer in order. The first failure aborts, layers allocated
    /// before it stay allocated and the network should be freed.
    pub fn init_with<I>(&mut self, init: &mut I) -> Result<&mut Self, Error>
    where
        I: Initializer + ?Sized,
    {
        match self.state {
            State::Freed => return Err(Error::Freed),
            State::Empty => return Err(Error::Empty),
            _ => {}
        }

        self.state = State::Building;
        for (i, layer) in self.layers.iter_mut().enumerate() {
            if let Err(e) = layer.allocate_with(init) {
                warn!("Failed to allocate layer {}: {}", i, e);
                return Err(e);
            }
        }

        self.state = State::Initialized;
        info!(
            "Initialized network: {} layers, {} parameters",
            self.layers.len(),
            self.parameter_count()
        );
        Ok(self)
    }

    fn check_initialized(&self) -> Result<(), Error> {
        match self.state {
            State::Freed => Err(Error::Freed),
            State::Empty => Err(Error::Empty),
            State::Building => Err(Error::Uninitialized),
            _ => Ok(()),
        }
    }

    /// Feeds `x` through every layer in order and returns the last layer's output.
    pub fn forward(&mut self, x: &[f32]) -> Result<&[f32], Error> {
        self.check_initialized()?;
        self.state = State::Initialized;

        trace!("Forward through layer 0");
        self.layers[0].forward(x)?;
        for i in 1..self.layers.len() {
            trace!("Forward through layer {}", i);
            let (done, rest) = self.layers.split_at_mut(i);
            let input = done[i - 1].y().ok_or(Error::Uninitialized)?;
            rest[0].forward(input)?;
        }

        self.state = State::Forwarded;
        self.layers.last().and_then(Layer::y).ok_or(Error::Empty)
    }

    /// Feeds `dy` through every layer in reverse order and returns the first layer's input gradient.
    pub fn backward(&mut self, dy: &[f32]) -> Result<&[f32], Error> {
        self.check_initialized()?;
        if self.state == State::Initialized {
            return Err(Error::NoForwardPass);
        }
        self.state = State::Forwarded;

        let last = self.layers.len() - 1;
        trace!("Backward through layer {}", last);
        self.layers[last].backward(dy)?;
        for i in (0..last).rev() {
            trace!("Backward through layer {}", i);
            let (rest, done) = self.layers.split_at_mut(i + 1);
            let grad = done[0].dx().ok_or(Error::Uninitialized)?;
            rest[i].backward(grad)?;
        }

        self.state = State::Backwarded;
        self.layers.first().and_then(Layer::dx).ok_or(Error::Empty)
    }

    /// Steps the parameters of every layer against their gradients.
    pub fn update(&mut self, learning_rate: f32) -> Result<(), Error> {
        self.check_initialized()?;
        if self.state != State::Backwarded {
            warn!("Updating the network without gradients from a fresh backward pass.");
        }
        // every layer steps or none does
        if let Some(i) = self.layers.iter().position(|l| !l.is_allocated()) {
            warn!("Layer {} isn't allocated, skipping the update", i);
            return Err(Error::Uninitialized);
        }

        for layer in &mut self.layers {
            layer.update(learning_rate)?;
        }
        self.state = State::Initialized;
        Ok(())
    }

    /// Releases every layer's buffers and the layer storage. Calling it again does nothing.
    pub fn free(&mut self) {
        if self.state == State::Freed {
            return;
        }
        for layer in &mut self.layers {
            layer.free_params();
        }
        self.layers = Vec::new();
        self.state = State::Freed;
        debug!("Freed network");
    }
}
