use std::collections::TryReserveError;
use std::error;
use std::fmt;

/// Everything that can go wrong while building or running a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A buffer or handle that must be present was empty or missing.
    InvalidArgument(&'static str),
    /// A matrix primitive received a zero dimension.
    ZeroDimension {
        rows: usize,
        inner: usize,
        cols: usize,
    },
    /// A layer shape with a zero component reached allocation.
    InvalidShape {
        batch_size: usize,
        input: usize,
        output: usize,
    },
    /// A buffer's length doesn't match the shape of the layer consuming it.
    ShapeMismatch { expected: usize, received: usize },
    /// Growing the layer sequence or a layer buffer failed.
    Allocation(TryReserveError),
    /// The layer has no buffers or bound operations.
    Uninitialized,
    /// The network has no layers.
    Empty,
    /// The network has been initialized and its topology can no longer change.
    Finalized,
    /// The network has been freed.
    Freed,
    /// Backward was requested before any forward pass since init.
    NoForwardPass,
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(what) => write!(f, "Invalid argument: {}.", what),
            Error::ZeroDimension { rows, inner, cols } => write!(
                f,
                "Matrix dimensions must be positive, received {}x{}x{}.",
                rows, inner, cols
            ),
            Error::InvalidShape {
                batch_size,
                input,
                output,
            } => write!(
                f,
                "Layer shape must be positive, received batch_size: {}, in: {}, out: {}.",
                batch_size, input, output
            ),
            Error::ShapeMismatch { expected, received } => write!(
                f,
                "Expected a buffer of length {} but received {}.",
                expected, received
            ),
            Error::Allocation(e) => write!(f, "Failed to allocate memory: {}.", e),
            Error::Uninitialized => f.write_str("The layer hasn't been allocated."),
            Error::Empty => {
                f.write_str("The network must have at least a single layer, but it was empty.")
            }
            Error::Finalized => {
                f.write_str("The network has already been initialized, layers can't be appended.")
            }
            Error::Freed => f.write_str("The network has been freed."),
            Error::NoForwardPass => {
                f.write_str("Backward pass requested before any forward pass.")
            }
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(e: TryReserveError) -> Self {
        Error::Allocation(e)
    }
}

/// Allocates a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn alloc_zeroed(len: usize) -> Result<Vec<f32>, Error> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, 0.);
    Ok(buf)
}
