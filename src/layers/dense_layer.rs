use super::{LayerKind, LayerParams, Operation, Weights};
use crate::error::{alloc_zeroed, Error};
use crate::matrix::{add_assign, multiply, transpose};

/// Your run of the mill fully connected (dense) layer, `y = x·w + b`.
///
/// The batch gradients are `dw = xᵀ·dy`, `db` is the column sum of `dy` and `dx = dy·wᵀ`.
/// Parameter gradients are summed over the batch and overwritten by every backward call.
#[derive(Debug, Clone)]
pub struct DenseOp {
    /// `in x batch_size`
    x_t: Vec<f32>,
    /// `out x in`
    w_t: Vec<f32>,
}

impl DenseOp {
    pub fn new(params: &LayerParams) -> Result<Self, Error> {
        Ok(Self {
            x_t: alloc_zeroed(params.x_len())?,
            w_t: alloc_zeroed(params.in_size * params.out_size)?,
        })
    }
}

impl Operation for DenseOp {
    fn kind(&self) -> LayerKind {
        LayerKind::Dense
    }

    fn forward(
        &mut self,
        params: &LayerParams,
        x: &[f32],
        weights: Option<&Weights>,
        y: &mut [f32],
    ) -> Result<(), Error> {
        let weights = weights.ok_or(Error::InvalidArgument("dense layer without weights"))?;
        let LayerParams {
            batch_size,
            in_size,
            out_size,
            ..
        } = *params;

        multiply(x, &weights.w, y, batch_size, in_size, out_size)?;
        for row in y.chunks_exact_mut(out_size) {
            add_assign(row, &weights.b, 1, out_size)?;
        }
        Ok(())
    }

    fn backward(
        &mut self,
        params: &LayerParams,
        x: &[f32],
        _y: &[f32],
        dy: &[f32],
        weights: Option<&mut Weights>,
        dx: &mut [f32],
    ) -> Result<(), Error> {
        let weights = weights.ok_or(Error::InvalidArgument("dense layer without weights"))?;
        let LayerParams {
            batch_size,
            in_size,
            out_size,
            ..
        } = *params;

        transpose(x, &mut self.x_t, batch_size, in_size)?;
        multiply(&self.x_t, dy, &mut weights.dw, in_size, batch_size, out_size)?;

        weights.db.iter_mut().for_each(|d| *d = 0.);
        for row in dy.chunks_exact(out_size) {
            add_assign(&mut weights.db, row, 1, out_size)?;
        }

        transpose(&weights.w, &mut self.w_t, in_size, out_size)?;
        multiply(dy, &self.w_t, dx, batch_size, out_size, in_size)?;
        Ok(())
    }

    fn scratch_len(&self) -> usize {
        self.x_t.len() + self.w_t.len()
    }
}
