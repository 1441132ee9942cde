use super::Optimizer;
use crate::{error::Error, network::Network};

/// Gradient descent simply steps the weights based on their derivatives.
#[derive(Clone, Debug)]
pub struct GradientDescent {
    l_rate: f32,
}

impl Optimizer for GradientDescent {
    fn step(&mut self, network: &mut Network) -> Result<(), Error> {
        network.update(self.l_rate)
    }
}

impl GradientDescent {
    pub fn builder() -> GradDescBuilder {
        Default::default()
    }

    pub fn new(l_rate: f32) -> Self {
        Self { l_rate }
    }

    pub fn l_rate(&self) -> f32 {
        self.l_rate
    }
}

impl Default for GradientDescent {
    fn default() -> Self {
        GradDescBuilder::default().build()
    }
}

/// Constructor for [GradientDescent](self::GradientDescent)
#[derive(Clone, Debug)]
pub struct GradDescBuilder {
    l_rate: f32,
}

impl Default for GradDescBuilder {
    fn default() -> Self {
        Self { l_rate: 0.01 }
    }
}

impl GradDescBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn l_rate(mut self, l_rate: f32) -> Self {
        self.l_rate = l_rate;
        self
    }

    pub fn build(self) -> GradientDescent {
        GradientDescent::new(self.l_rate)
    }
}
