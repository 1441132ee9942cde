use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Source of initial weight values for parameterized layers.
/// `in_size` and `size` are the layer's fan-in and fan-out.
pub trait Initializer {
    fn get(&mut self, in_size: usize, size: usize) -> f32;
}

///Xavier initialization should be used for layers with symetric activation functions such as sigmoid or tanH
#[derive(Debug, Clone)]
pub struct Xavier {
    rng: SmallRng,
}
impl Xavier {
    pub fn new() -> Xavier {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Xavier {
        Xavier {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}
impl Default for Xavier {
    fn default() -> Self {
        Self::new()
    }
}
impl Initializer for Xavier {
    fn get(&mut self, in_size: usize, _size: usize) -> f32 {
        self.rng.sample::<f32, StandardNormal>(StandardNormal) / (in_size as f32).sqrt()
    }
}

///Kaiming initialization should be used for layers with asymetric activation functions such as RELU
#[derive(Debug, Clone)]
pub struct Kaiming {
    rng: SmallRng,
}
impl Kaiming {
    pub fn new() -> Kaiming {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Kaiming {
        Kaiming {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}
impl Default for Kaiming {
    fn default() -> Self {
        Self::new()
    }
}
impl Initializer for Kaiming {
    fn get(&mut self, in_size: usize, _: usize) -> f32 {
        self.rng.sample::<f32, StandardNormal>(StandardNormal) * (2f32 / (in_size as f32)).sqrt()
    }
}

///Always initializes weights to one
#[derive(Debug, Clone, Copy, Default)]
pub struct Ones;
impl Initializer for Ones {
    fn get(&mut self, _: usize, _: usize) -> f32 {
        1f32
    }
}

/// This initializer accepts an iterator over f32 values and uses them to initialize the weights.
/// Panics if a weights is requested but the iterator returns None.
pub struct WeightInit<T: Iterator<Item = f32>> {
    iter: T,
}
impl<I: Iterator<Item = f32>> WeightInit<I> {
    pub fn new<T: IntoIterator<Item = f32, IntoIter = I>>(weights: T) -> Self {
        Self {
            iter: weights.into_iter(),
        }
    }
}

impl<I: Iterator<Item = f32>> Initializer for WeightInit<I> {
    fn get(&mut self, _in_size: usize, _size: usize) -> f32 {
        self.iter.next().expect("Ran out of weights")
    }
}
