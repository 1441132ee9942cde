//! Dense matrix primitives over flat, row-major `f32` buffers.
//!
//! Every function writes into a caller-provided output buffer and returns it.
//! Dimensions must be positive, otherwise [Error::ZeroDimension] is returned.
//! Buffers shorter than the dimensions imply are a contract violation and panic.

use crate::error::Error;

fn check_dims(rows: usize, inner: usize, cols: usize) -> Result<(), Error> {
    if rows == 0 || inner == 0 || cols == 0 {
        Err(Error::ZeroDimension { rows, inner, cols })
    } else {
        Ok(())
    }
}

/// Element-wise sum of two `rows x cols` matrices, `out[i] = a[i] + b[i]`.
pub fn add<'o>(
    a: &[f32],
    b: &[f32],
    out: &'o mut [f32],
    rows: usize,
    cols: usize,
) -> Result<&'o mut [f32], Error> {
    check_dims(rows, 1, cols)?;
    let len = rows * cols;
    assert!(a.len() >= len && b.len() >= len && out.len() >= len);

    for ((o, a), b) in out[..len].iter_mut().zip(&a[..len]).zip(&b[..len]) {
        *o = *a + *b;
    }
    Ok(out)
}

/// In-place variant of [add], `acc[i] += b[i]`.
pub fn add_assign<'o>(
    acc: &'o mut [f32],
    b: &[f32],
    rows: usize,
    cols: usize,
) -> Result<&'o mut [f32], Error> {
    check_dims(rows, 1, cols)?;
    let len = rows * cols;
    assert!(acc.len() >= len && b.len() >= len);

    for (o, b) in acc[..len].iter_mut().zip(&b[..len]) {
        *o += *b;
    }
    Ok(acc)
}

/// `acc[i] += alpha * b[i]`, the gradient descent step.
pub fn add_scaled<'o>(
    acc: &'o mut [f32],
    b: &[f32],
    alpha: f32,
    rows: usize,
    cols: usize,
) -> Result<&'o mut [f32], Error> {
    check_dims(rows, 1, cols)?;
    let len = rows * cols;
    assert!(acc.len() >= len && b.len() >= len);

    for (o, b) in acc[..len].iter_mut().zip(&b[..len]) {
        *o += alpha * *b;
    }
    Ok(acc)
}

/// Product of an `m x n` matrix `a` and an `n x p` matrix `b`, written into the `m x p` matrix `out`.
pub fn multiply<'o>(
    a: &[f32],
    b: &[f32],
    out: &'o mut [f32],
    m: usize,
    n: usize,
    p: usize,
) -> Result<&'o mut [f32], Error> {
    check_dims(m, n, p)?;
    assert!(a.len() >= m * n && b.len() >= n * p && out.len() >= m * p);

    for i in 0..m {
        let a_row = &a[i * n..(i + 1) * n];
        for j in 0..p {
            let mut acc = 0.;
            for (k, a) in a_row.iter().enumerate() {
                acc += *a * b[k * p + j];
            }
            out[i * p + j] = acc;
        }
    }
    Ok(out)
}

/// Writes the transpose of the `rows x cols` matrix `a` into the `cols x rows` matrix `out`.
pub fn transpose<'o>(
    a: &[f32],
    out: &'o mut [f32],
    rows: usize,
    cols: usize,
) -> Result<&'o mut [f32], Error> {
    check_dims(rows, 1, cols)?;
    let len = rows * cols;
    assert!(a.len() >= len && out.len() >= len);

    for (i, row) in a[..len].chunks_exact(cols).enumerate() {
        for (j, v) in row.iter().enumerate() {
            out[j * rows + i] = *v;
        }
    }
    Ok(out)
}
