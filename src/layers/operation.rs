use super::{ActivationOp, DenseOp, LayerKind, LayerParams, Weights};
use crate::a_funcs::{Identity, ReLU, SiLU, Sigmoid, TanH};
use crate::error::Error;

use enum_dispatch::enum_dispatch;

/// Forward and backward math of a layer kind.
///
/// Buffers are owned by the layer and lent to the operation for the duration of a call.
/// `x` and `dx` hold `batch_size x in` values, `y` and `dy` hold `batch_size x out`.
#[enum_dispatch]
pub trait Operation {
    /// The layer kind this operation implements.
    fn kind(&self) -> LayerKind;

    /// Computes `y` from `x`.
    fn forward(
        &mut self,
        params: &LayerParams,
        x: &[f32],
        weights: Option<&Weights>,
        y: &mut [f32],
    ) -> Result<(), Error>;

    /// Computes `dx`, and the parameter gradients if there are any, from `dy`.
    /// `x` and `y` are the values stored by the last forward call.
    fn backward(
        &mut self,
        params: &LayerParams,
        x: &[f32],
        y: &[f32],
        dy: &[f32],
        weights: Option<&mut Weights>,
        dx: &mut [f32],
    ) -> Result<(), Error>;

    /// Floats of scratch space held by the operation.
    fn scratch_len(&self) -> usize {
        0
    }
}

/// An operation bound to a layer. Chosen once when the layer is allocated.
#[enum_dispatch(Operation)]
#[derive(Debug, Clone)]
pub enum Op {
    Identity(ActivationOp<Identity>),
    Dense(DenseOp),
    Sigmoid(ActivationOp<Sigmoid>),
    TanH(ActivationOp<TanH>),
    ReLU(ActivationOp<ReLU>),
    SiLU(ActivationOp<SiLU>),
}

impl Op {
    /// Picks the operation for `params.kind`, allocating any scratch space it needs.
    pub fn bind(params: &LayerParams) -> Result<Self, Error> {
        Ok(match params.kind {
            LayerKind::Identity => ActivationOp::new(Identity, LayerKind::Identity).into(),
            LayerKind::Dense => DenseOp::new(params)?.into(),
            LayerKind::Sigmoid => ActivationOp::new(Sigmoid, LayerKind::Sigmoid).into(),
            LayerKind::TanH => ActivationOp::new(TanH, LayerKind::TanH).into(),
            LayerKind::ReLU => ActivationOp::new(ReLU, LayerKind::ReLU).into(),
            LayerKind::SiLU => ActivationOp::new(SiLU, LayerKind::SiLU).into(),
        })
    }
}
