pub mod a_funcs;
pub mod config;
pub mod error;
pub mod initializer;
pub mod layers;
pub mod loss;
pub mod matrix;
pub mod network;
pub mod optimizer;

pub use crate::error::Error;
pub use crate::layers::{Layer, LayerKind, LayerParams};
pub use crate::network::{Network, State};
