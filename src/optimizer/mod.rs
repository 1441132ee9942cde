pub use gradient_descent::{GradDescBuilder, GradientDescent};
pub mod gradient_descent;

use crate::{
    error::Error,
    loss::{Loss, LossFunc, MeanSquared},
    network::Network,
};
use std::ops::{Deref, DerefMut};

pub trait Optimizer {
    /// Modifies the network's parameters based on the gradients of the last backward pass.
    fn step(&mut self, network: &mut Network) -> Result<(), Error>;
}

/// Drives the forward, backward, update cycle of a network for batches of data.
#[derive(Debug)]
pub struct DefaultOptimizer<F = MeanSquared, O = GradientDescent> {
    optimizer: O,
    network: Network,
    loss: F,
}

fn check_target(output: &[f32], target: &[f32]) -> Result<(), Error> {
    if output.len() != target.len() {
        Err(Error::ShapeMismatch {
            expected: output.len(),
            received: target.len(),
        })
    } else {
        Ok(())
    }
}

impl<F, O> DefaultOptimizer<F, O>
where
    F: LossFunc,
    O: Optimizer,
{
    pub fn new(network: Network, optimizer: O, loss: F) -> Self {
        Self {
            optimizer,
            network,
            loss,
        }
    }

    /// Trains on a single batch. `input` and `target` are flat `batch_size x width` buffers.
    /// Returns the loss the network had before the update.
    pub fn process(&mut self, input: &[f32], target: &[f32]) -> Result<f32, Error> {
        let output = self.network.forward(input)?;
        check_target(output, target)?;
        let Loss { loss, grads } = self.loss.eval(output, target);
        self.network.backward(&grads)?;
        self.optimizer.step(&mut self.network)?;
        Ok(loss)
    }

    /// Evaluates the loss on a batch without training.
    pub fn test(&mut self, input: &[f32], target: &[f32]) -> Result<f32, Error> {
        let output = self.network.forward(input)?;
        check_target(output, target)?;
        Ok(self.loss.eval(output, target).loss)
    }

    pub fn into_network(self) -> Network {
        self.network
    }
}

impl<F, O> Deref for DefaultOptimizer<F, O> {
    type Target = Network;

    fn deref(&self) -> &Self::Target {
        &self.network
    }
}

impl<F, O> DerefMut for DefaultOptimizer<F, O> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.network
    }
}
