pub mod dense_layer;
pub mod map_layer;
mod operation;

pub use dense_layer::DenseOp;
pub use map_layer::ActivationOp;
pub use operation::{Op, Operation};

use crate::error::{alloc_zeroed, Error};
use crate::initializer::{Initializer, Xavier};
use crate::matrix::add_scaled;
use map_layer::check_elementwise;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// The closed set of layer kinds. The kind picks the forward and backward math
/// a layer binds when it is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "dense")]
    Dense,
    #[serde(rename = "sigmoid")]
    Sigmoid,
    #[serde(rename = "tanh")]
    TanH,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "silu")]
    SiLU,
}

impl LayerKind {
    /// Whether layers of this kind own weights and biases.
    pub fn is_parameterized(self) -> bool {
        matches!(self, LayerKind::Dense)
    }

    /// Element-wise kinds map every input to exactly one output and need `in == out`.
    pub fn is_elementwise(self) -> bool {
        !self.is_parameterized()
    }
}

impl Default for LayerKind {
    fn default() -> Self {
        LayerKind::Identity
    }
}

/// Shape and kind of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayerParams {
    pub kind: LayerKind,
    pub batch_size: usize,
    pub in_size: usize,
    pub out_size: usize,
}

impl LayerParams {
    pub fn new(kind: LayerKind, batch_size: usize, in_size: usize, out_size: usize) -> Self {
        Self {
            kind,
            batch_size,
            in_size,
            out_size,
        }
    }

    /// Length of the input (and input gradient) buffer.
    pub fn x_len(&self) -> usize {
        self.batch_size * self.in_size
    }

    /// Length of the output (and output gradient) buffer.
    pub fn y_len(&self) -> usize {
        self.batch_size * self.out_size
    }

    fn validate(&self) -> Result<(), Error> {
        let invalid = Error::InvalidShape {
            batch_size: self.batch_size,
            input: self.in_size,
            output: self.out_size,
        };
        if self.batch_size == 0 || self.in_size == 0 || self.out_size == 0 {
            return Err(invalid);
        }
        let overflow = self.batch_size.checked_mul(self.in_size).is_none()
            || self.batch_size.checked_mul(self.out_size).is_none()
            || self.in_size.checked_mul(self.out_size).is_none();
        if overflow {
            return Err(invalid);
        }
        Ok(())
    }
}

/// Trainable parameters of a layer and their gradients.
/// `w` is `in x out` row-major, `b` has one entry per output.
///
/// The buffers can be read and written but never resized.
#[derive(Debug, Clone)]
pub struct Weights {
    pub(crate) w: Vec<f32>,
    pub(crate) b: Vec<f32>,
    pub(crate) dw: Vec<f32>,
    pub(crate) db: Vec<f32>,
}

impl Weights {
    fn new<I>(in_size: usize, out_size: usize, init: &mut I) -> Result<Self, Error>
    where
        I: Initializer + ?Sized,
    {
        let mut w = alloc_zeroed(in_size * out_size)?;
        for v in &mut w {
            *v = init.get(in_size, out_size);
        }
        Ok(Self {
            w,
            b: alloc_zeroed(out_size)?,
            dw: alloc_zeroed(in_size * out_size)?,
            db: alloc_zeroed(out_size)?,
        })
    }

    pub fn w(&self) -> &[f32] {
        &self.w
    }

    pub fn b(&self) -> &[f32] {
        &self.b
    }

    pub fn dw(&self) -> &[f32] {
        &self.dw
    }

    pub fn db(&self) -> &[f32] {
        &self.db
    }

    pub fn w_mut(&mut self) -> &mut [f32] {
        &mut self.w
    }

    pub fn b_mut(&mut self) -> &mut [f32] {
        &mut self.b
    }
}

#[derive(Debug, Clone)]
struct Buffers {
    x: Vec<f32>,
    y: Vec<f32>,
    dx: Vec<f32>,
    weights: Option<Weights>,
    op: Op,
}

/// A single stage of a network.
///
/// A layer is either fully allocated, owning every buffer its kind needs together
/// with its bound operation, or holds nothing but its [LayerParams].
#[derive(Debug, Clone)]
pub struct Layer {
    params: LayerParams,
    buffers: Option<Buffers>,
}

impl Layer {
    /// Creates an unallocated layer.
    pub fn new(params: LayerParams) -> Self {
        Self {
            params,
            buffers: None,
        }
    }

    pub fn params(&self) -> &LayerParams {
        &self.params
    }

    /// Changing the shape of an allocated layer releases its buffers, since their sizes no longer fit.
    pub(crate) fn params_mut(&mut self) -> &mut LayerParams {
        self.free_params();
        &mut self.params
    }

    pub fn kind(&self) -> LayerKind {
        self.params.kind
    }

    /// Allocates the layer's buffers and binds its operation, initializing weights with [Xavier].
    pub fn allocate_for_params(&mut self) -> Result<&mut Self, Error> {
        self.allocate_with(&mut Xavier::new())
    }

    /// Allocates the layer's buffers and binds its operation. On failure the layer is left unallocated.
    pub fn allocate_with<I>(&mut self, init: &mut I) -> Result<&mut Self, Error>
    where
        I: Initializer + ?Sized,
    {
        self.free_params();
        self.params.validate()?;

        let params = self.params;
        let weights = if params.kind.is_parameterized() {
            Some(Weights::new(params.in_size, params.out_size, init)?)
        } else {
            None
        };

        let buffers = Buffers {
            x: alloc_zeroed(params.x_len())?,
            y: alloc_zeroed(params.y_len())?,
            dx: alloc_zeroed(params.x_len())?,
            weights,
            op: Op::bind(&params)?,
        };
        debug!(
            "Allocated {:?} layer: batch_size {}, in {}, out {}",
            params.kind, params.batch_size, params.in_size, params.out_size
        );
        self.buffers = Some(buffers);
        Ok(self)
    }

    /// Releases every buffer and unbinds the operation. Does nothing if the layer isn't allocated.
    pub fn free_params(&mut self) {
        if self.buffers.take().is_some() {
            trace!("Released {:?} layer buffers", self.params.kind);
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.buffers.is_some()
    }

    /// Whether forward and backward are bound. Always matches [is_allocated](Self::is_allocated).
    pub fn is_bound(&self) -> bool {
        self.buffers.is_some()
    }

    /// Kind of the bound operation, None if the layer isn't allocated.
    pub fn bound_kind(&self) -> Option<LayerKind> {
        self.buffers.as_ref().map(|b| b.op.kind())
    }

    /// Copies `prev`'s batch size and output width into this layer's batch size and input width.
    pub(crate) fn connect_to(&mut self, prev: &LayerParams) {
        if self.params.batch_size != prev.batch_size || self.params.in_size != prev.out_size {
            let params = self.params_mut();
            params.batch_size = prev.batch_size;
            params.in_size = prev.out_size;
        }
    }

    /// Runs the layer on `x`, which must hold `batch_size x in` values.
    pub fn forward(&mut self, x: &[f32]) -> Result<&[f32], Error> {
        let params = self.params;
        let buffers = self.buffers.as_mut().ok_or(Error::Uninitialized)?;
        if x.is_empty() {
            return Err(Error::InvalidArgument("empty input"));
        }
        if x.len() != buffers.x.len() {
            return Err(Error::ShapeMismatch {
                expected: buffers.x.len(),
                received: x.len(),
            });
        }
        // fail before the stored input is overwritten
        if params.kind.is_elementwise() {
            check_elementwise(&params)?;
        }

        buffers.x.copy_from_slice(x);
        let Buffers {
            x, y, weights, op, ..
        } = buffers;
        op.forward(&params, x, weights.as_ref(), y)?;
        Ok(y.as_slice())
    }

    /// Propagates the output gradient `dy` back through the layer, filling the
    /// parameter gradients and returning the input gradient.
    pub fn backward(&mut self, dy: &[f32]) -> Result<&[f32], Error> {
        let params = self.params;
        let buffers = self.buffers.as_mut().ok_or(Error::Uninitialized)?;
        if dy.is_empty() {
            return Err(Error::InvalidArgument("empty gradient"));
        }
        if dy.len() != buffers.y.len() {
            return Err(Error::ShapeMismatch {
                expected: buffers.y.len(),
                received: dy.len(),
            });
        }

        let Buffers {
            x,
            y,
            dx,
            weights,
            op,
        } = buffers;
        op.backward(&params, x, y, dy, weights.as_mut(), dx)?;
        Ok(dx.as_slice())
    }

    /// Steps the weights and biases against their gradients. Does nothing for kinds without parameters.
    pub fn update(&mut self, learning_rate: f32) -> Result<(), Error> {
        let params = self.params;
        let buffers = self.buffers.as_mut().ok_or(Error::Uninitialized)?;
        if let Some(weights) = &mut buffers.weights {
            add_scaled(
                &mut weights.w,
                &weights.dw,
                -learning_rate,
                params.in_size,
                params.out_size,
            )?;
            add_scaled(&mut weights.b, &weights.db, -learning_rate, 1, params.out_size)?;
        }
        Ok(())
    }

    pub fn x(&self) -> Option<&[f32]> {
        self.buffers.as_ref().map(|b| b.x.as_slice())
    }

    pub fn y(&self) -> Option<&[f32]> {
        self.buffers.as_ref().map(|b| b.y.as_slice())
    }

    pub fn dx(&self) -> Option<&[f32]> {
        self.buffers.as_ref().map(|b| b.dx.as_slice())
    }

    pub fn weights(&self) -> Option<&Weights> {
        self.buffers.as_ref().and_then(|b| b.weights.as_ref())
    }

    pub fn weights_mut(&mut self) -> Option<&mut Weights> {
        self.buffers.as_mut().and_then(|b| b.weights.as_mut())
    }

    pub fn w(&self) -> Option<&[f32]> {
        self.weights().map(|w| w.w.as_slice())
    }

    pub fn b(&self) -> Option<&[f32]> {
        self.weights().map(|w| w.b.as_slice())
    }

    pub fn dw(&self) -> Option<&[f32]> {
        self.weights().map(|w| w.dw.as_slice())
    }

    pub fn db(&self) -> Option<&[f32]> {
        self.weights().map(|w| w.db.as_slice())
    }

    /// Number of trainable values, zero for kinds without parameters.
    pub fn parameter_count(&self) -> usize {
        if self.params.kind.is_parameterized() {
            self.params.in_size * self.params.out_size + self.params.out_size
        } else {
            0
        }
    }

    /// Number of floats currently owned by the layer, including operation scratch space.
    pub fn allocated_len(&self) -> usize {
        self.buffers.as_ref().map_or(0, |b| {
            let weights = b.weights.as_ref().map_or(0, |w| {
                w.w.len() + w.b.len() + w.dw.len() + w.db.len()
            });
            b.x.len() + b.y.len() + b.dx.len() + weights + b.op.scratch_len()
        })
    }
}

/// Shape propagation: `next` takes `prev`'s batch size and uses its output width as input width.
pub fn connect(prev: &Layer, next: &mut Layer) {
    next.connect_to(prev.params());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Compares two arrays with the given error tolerance. Returns None if either of the arrays contains NaN.
    pub(crate) fn is_equal_ish(left: &[f32], right: &[f32], tolerance: f32) -> Option<bool> {
        assert_eq!(left.len(), right.len());
        let err = left
            .iter()
            .zip(right)
            .map(|(l, r)| f32::abs(l - r))
            .try_fold(0., |a, b| {
                if let Some(ord) = a.partial_cmp(&b) {
                    Some(match ord {
                        std::cmp::Ordering::Less => b,
                        std::cmp::Ordering::Equal => a,
                        std::cmp::Ordering::Greater => a,
                    })
                } else {
                    None
                }
            });
        err.map(|e| e < tolerance)
    }

    pub(crate) fn check(expected: &[f32], output: &[f32], tolerance: f32, id: &str) {
        let diag = || format!("expected: {:?}\nreceived: {:?}", expected, output);

        if let Some(eq) = is_equal_ish(expected, output, tolerance) {
            if eq {
                return;
            } else {
                panic!("Evaluation produced incorrect {}.\n{}", id, diag())
            }
        } else {
            panic!("Evaluation produced a NaN\n{}", diag())
        }
    }

    const TOLERANCE: f32 = 0.0001;

    fn assert_unallocated(layer: &Layer) {
        assert!(layer.x().is_none());
        assert!(layer.y().is_none());
        assert!(layer.dx().is_none());
        assert!(layer.w().is_none());
        assert!(layer.b().is_none());
        assert!(layer.dw().is_none());
        assert!(layer.db().is_none());
        assert!(layer.bound_kind().is_none());
        assert_eq!(layer.allocated_len(), 0);
    }

    #[test]
    fn allocate_and_free() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Identity, 1, 2, 3));

        layer.allocate_for_params().unwrap();
        assert_eq!(layer.x().map(<[f32]>::len), Some(2));
        assert_eq!(layer.y().map(<[f32]>::len), Some(3));
        assert_eq!(layer.dx().map(<[f32]>::len), Some(2));
        assert!(layer.w().is_none());
        assert!(layer.b().is_none());
        assert!(layer.dw().is_none());
        assert!(layer.db().is_none());
        assert_eq!(layer.bound_kind(), Some(LayerKind::Identity));
        assert!(layer.is_bound());

        layer.free_params();
        assert_unallocated(&layer);
        assert!(!layer.is_bound());
    }

    #[test]
    fn allocate_dense_parameters() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Dense, 4, 2, 3));
        layer.allocate_for_params().unwrap();

        assert_eq!(layer.w().map(<[f32]>::len), Some(6));
        assert_eq!(layer.b().map(<[f32]>::len), Some(3));
        assert_eq!(layer.dw().map(<[f32]>::len), Some(6));
        assert_eq!(layer.db().map(<[f32]>::len), Some(3));
        assert_eq!(layer.x().map(<[f32]>::len), Some(8));
        assert_eq!(layer.y().map(<[f32]>::len), Some(12));
        assert_eq!(layer.parameter_count(), 9);
        assert_eq!(layer.bound_kind(), Some(LayerKind::Dense));
    }

    #[test]
    fn allocation_fails_if_parameters_contain_zero() {
        let params = [
            LayerParams::new(LayerKind::Identity, 0, 2, 3),
            LayerParams::new(LayerKind::Identity, 1, 0, 3),
            LayerParams::new(LayerKind::Identity, 1, 2, 0),
            LayerParams::new(LayerKind::Dense, 0, 2, 3),
        ];

        for p in &params {
            let mut layer = Layer::new(*p);
            assert!(matches!(
                layer.allocate_for_params(),
                Err(Error::InvalidShape { .. })
            ));
            assert_unallocated(&layer);
        }
    }

    #[test]
    fn failed_reallocation_leaves_layer_unallocated() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Identity, 1, 2, 2));
        layer.allocate_for_params().unwrap();
        layer.params_mut().out_size = 0;
        assert!(layer.allocate_for_params().is_err());
        assert_unallocated(&layer);
    }

    #[test]
    fn free_twice() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Sigmoid, 1, 2, 2));
        layer.free_params();
        layer.allocate_for_params().unwrap();
        layer.free_params();
        layer.free_params();
        assert_unallocated(&layer);
    }

    #[test]
    fn connect_propagates_shape() {
        let layer = Layer::new(LayerParams {
            batch_size: 8,
            in_size: 2,
            out_size: 10,
            ..Default::default()
        });
        let mut next_layer = Layer::new(LayerParams {
            out_size: 3,
            ..Default::default()
        });

        connect(&layer, &mut next_layer);

        assert_eq!(next_layer.params().batch_size, 8);
        assert_eq!(next_layer.params().in_size, 10);
        assert_eq!(next_layer.params().out_size, 3);
    }

    #[test]
    fn connect_releases_stale_buffers() {
        let prev = Layer::new(LayerParams::new(LayerKind::Identity, 2, 3, 3));
        let mut next = Layer::new(LayerParams::new(LayerKind::Identity, 1, 1, 1));
        next.allocate_for_params().unwrap();

        connect(&prev, &mut next);
        assert!(!next.is_allocated());
        next.allocate_for_params().unwrap();
        assert_eq!(next.x().map(<[f32]>::len), Some(6));
    }

    /// Dense layer whose weights double its input.
    fn doubling_layer() -> Layer {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Dense, 1, 3, 3));
        layer.allocate_for_params().unwrap();
        let weights = layer.weights_mut().unwrap();
        weights.w.copy_from_slice(&[2., 0., 0., 0., 2., 0., 0., 0., 2.]);
        weights.b.iter_mut().for_each(|b| *b = 0.);
        layer
    }

    #[test]
    fn forward() {
        let mut layer = doubling_layer();
        let output = layer.forward(&[-1., 0., 1.]).unwrap();
        check(&[-2., 0., 2.], output, TOLERANCE, "output");
        check(&[-1., 0., 1.], layer.x().unwrap(), TOLERANCE, "stored input");
    }

    #[test]
    fn identity_forward_and_backward() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Identity, 2, 2, 2));
        layer.allocate_for_params().unwrap();

        let output = layer.forward(&[1., -2., 3., 0.5]).unwrap();
        check(&[1., -2., 3., 0.5], output, TOLERANCE, "output");

        let dx = layer.backward(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        check(&[0.1, 0.2, 0.3, 0.4], dx, TOLERANCE, "input gradient");
    }

    #[test]
    fn forward_fails_if_layer_is_unallocated() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Identity, 1, 1, 1));
        assert_eq!(layer.forward(&[0.]).unwrap_err(), Error::Uninitialized);
    }

    #[test]
    fn forward_fails_if_x_is_empty() {
        let mut layer = doubling_layer();
        assert_eq!(
            layer.forward(&[]).unwrap_err(),
            Error::InvalidArgument("empty input")
        );
        // no side effects on the stored input
        check(&[0., 0., 0.], layer.x().unwrap(), TOLERANCE, "stored input");
    }

    #[test]
    fn forward_fails_on_wrong_length() {
        let mut layer = doubling_layer();
        assert_eq!(
            layer.forward(&[1., 2.]).unwrap_err(),
            Error::ShapeMismatch {
                expected: 3,
                received: 2
            }
        );
    }

    #[test]
    fn backward_fails_if_layer_is_unallocated() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Dense, 1, 2, 3));
        assert_eq!(layer.backward(&[0., 0., 0.]).unwrap_err(), Error::Uninitialized);
    }

    #[test]
    fn backward_fails_if_dy_is_empty() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Dense, 1, 2, 3));
        layer.allocate_for_params().unwrap();
        assert_eq!(
            layer.backward(&[]).unwrap_err(),
            Error::InvalidArgument("empty gradient")
        );
    }

    #[test]
    fn elementwise_kind_rejects_mismatched_widths() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Identity, 1, 2, 3));
        layer.allocate_for_params().unwrap();
        assert_eq!(
            layer.forward(&[1., 2.]).unwrap_err(),
            Error::ShapeMismatch {
                expected: 2,
                received: 3
            }
        );
        // the failed call leaves the stored input untouched
        assert_eq!(layer.x(), Some(&[0f32, 0.][..]));
    }

    #[test]
    fn update() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Dense, 1, 2, 3));
        layer.allocate_for_params().unwrap();
        {
            let weights = layer.weights_mut().unwrap();
            weights.w_mut().copy_from_slice(&[1., 1., 1., 1., 1., 1.]);
            weights.dw.copy_from_slice(&[1., 2., 3., 4., 5., 6.]);
            weights.b_mut().copy_from_slice(&[1., 1., 1.]);
            weights.db.copy_from_slice(&[1., 2., 3.]);
        }

        layer.update(0.01).unwrap();

        check(
            &[0.99, 0.98, 0.97, 0.96, 0.95, 0.94],
            layer.w().unwrap(),
            TOLERANCE,
            "weights",
        );
        check(&[0.99, 0.98, 0.97], layer.b().unwrap(), TOLERANCE, "biases");
    }

    #[test]
    fn update_is_noop_without_parameters() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::ReLU, 1, 2, 2));
        layer.allocate_for_params().unwrap();
        layer.forward(&[1., -1.]).unwrap();
        layer.update(0.5).unwrap();
        check(&[1., 0.], layer.y().unwrap(), TOLERANCE, "output");
    }

    #[test]
    fn allocated_len_tracks_buffers() {
        let mut layer = Layer::new(LayerParams::new(LayerKind::Identity, 1, 2, 3));
        assert_eq!(layer.allocated_len(), 0);
        layer.allocate_for_params().unwrap();
        assert_eq!(layer.allocated_len(), 2 + 3 + 2);
        layer.free_params();
        assert_eq!(layer.allocated_len(), 0);
    }
}
