use serde::{Deserialize, Serialize};

pub trait ActivFunc {
    fn evaluate(&self, x: f32) -> f32;
    /// Derivative at `inp`, where `out` is the already evaluated output.
    fn derivative(&self, inp: f32, out: f32) -> f32;
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default)]
pub struct Sigmoid;
impl ActivFunc for Sigmoid {
    fn evaluate(&self, x: f32) -> f32 {
        1. / (1. + (-x).exp())
    }
    fn derivative(&self, _: f32, out: f32) -> f32 {
        out * (1. - out)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default)]
pub struct Identity;
impl ActivFunc for Identity {
    fn evaluate(&self, x: f32) -> f32 {
        x
    }
    fn derivative(&self, _: f32, _: f32) -> f32 {
        1.
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default)]
pub struct TanH;
impl ActivFunc for TanH {
    fn evaluate(&self, x: f32) -> f32 {
        x.tanh()
    }
    fn derivative(&self, _inp: f32, out: f32) -> f32 {
        1. - out * out
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default)]
pub struct SiLU;
impl ActivFunc for SiLU {
    fn evaluate(&self, x: f32) -> f32 {
        x / (1. + (-x).exp()) // x * sigmoid(x)
    }
    fn derivative(&self, inp: f32, _out: f32) -> f32 {
        let s = Sigmoid.evaluate(inp);
        s * (1. + inp * (1. - s))
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default)]
pub struct ReLU;
impl ActivFunc for ReLU {
    fn evaluate(&self, x: f32) -> f32 {
        f32::max(x, 0.)
    }
    fn derivative(&self, inp: f32, _out: f32) -> f32 {
        if inp > 0. {
            1.
        } else {
            0.
        }
    }
}
