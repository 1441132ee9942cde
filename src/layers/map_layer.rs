//! Element-wise layer kinds, where every output depends only on the input at the same position.

use super::{LayerKind, LayerParams, Operation, Weights};
use crate::a_funcs::ActivFunc;
use crate::error::Error;

pub(crate) fn check_elementwise(params: &LayerParams) -> Result<(), Error> {
    if params.in_size != params.out_size {
        Err(Error::ShapeMismatch {
            expected: params.in_size,
            received: params.out_size,
        })
    } else {
        Ok(())
    }
}

/// Applies an activation function to every value. The identity kind is `ActivationOp<Identity>`.
#[derive(Debug, Clone, Copy)]
pub struct ActivationOp<F> {
    a_func: F,
    kind: LayerKind,
}

impl<F> ActivationOp<F> {
    pub fn new(a_func: F, kind: LayerKind) -> Self {
        Self { a_func, kind }
    }
}

impl<F> Operation for ActivationOp<F>
where
    F: ActivFunc,
{
    fn kind(&self) -> LayerKind {
        self.kind
    }

    fn forward(
        &mut self,
        params: &LayerParams,
        x: &[f32],
        _weights: Option<&Weights>,
        y: &mut [f32],
    ) -> Result<(), Error> {
        check_elementwise(params)?;
        for (o, i) in y.iter_mut().zip(x) {
            *o = self.a_func.evaluate(*i);
        }
        Ok(())
    }

    fn backward(
        &mut self,
        params: &LayerParams,
        x: &[f32],
        y: &[f32],
        dy: &[f32],
        _weights: Option<&mut Weights>,
        dx: &mut [f32],
    ) -> Result<(), Error> {
        check_elementwise(params)?;
        for (((d, i), o), g) in dx.iter_mut().zip(x).zip(y).zip(dy) {
            *d = *g * self.a_func.derivative(*i, *o);
        }
        Ok(())
    }
}
