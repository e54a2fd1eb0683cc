//! Dense vector kernels
//!
//! Level-1 operations on slices: inner product, 2-norm, axpy, scaling and the
//! fused updates used by the Krylov solvers. Every kernel checks lengths and
//! splits the index space into static blocks via [`crate::parallel`].

use crate::error::{Result, ensure_len};
use crate::parallel::{ParallelConfig, fold_blocks, for_each_block_mut};
use crate::traits::Scalar;
use ndarray::{ArrayBase, Data, Ix1};
use std::borrow::Cow;

/// Compute inner product (x, y) = Σ x_i * y_i
///
/// Partial sums are formed per block and added in block order, so the result
/// can differ in the last bits between different worker counts.
pub fn dot<T: Scalar>(x: &[T], y: &[T], parallel: &ParallelConfig) -> Result<T> {
    ensure_len("dot", x.len(), y.len())?;
    Ok(fold_blocks(
        x.len(),
        parallel,
        T::zero(),
        |range| {
            x[range.clone()]
                .iter()
                .zip(&y[range])
                .fold(T::zero(), |acc, (&xi, &yi)| acc + xi * yi)
        },
        |a, b| a + b,
    ))
}

/// Compute vector 2-norm: ||x||_2 = sqrt((x, x))
#[inline]
pub fn norm2<T: Scalar>(x: &[T], parallel: &ParallelConfig) -> Result<T> {
    Ok(dot(x, x, parallel)?.sqrt())
}

/// Compute axpy: y = α * x + y
pub fn axpy<T: Scalar>(alpha: T, x: &[T], y: &mut [T], parallel: &ParallelConfig) -> Result<()> {
    ensure_len("axpy", y.len(), x.len())?;
    for_each_block_mut(y, parallel, |offset, block| {
        let xs = &x[offset..offset + block.len()];
        for (yi, &xi) in block.iter_mut().zip(xs) {
            *yi += alpha * xi;
        }
    });
    Ok(())
}

/// Compute vector scale in-place: x = α * x
pub fn scal<T: Scalar>(alpha: T, x: &mut [T], parallel: &ParallelConfig) {
    for_each_block_mut(x, parallel, |_, block| {
        for xi in block.iter_mut() {
            *xi *= alpha;
        }
    });
}

/// Compute y = α * x + β * y in place
pub fn axpby<T: Scalar>(
    alpha: T,
    x: &[T],
    beta: T,
    y: &mut [T],
    parallel: &ParallelConfig,
) -> Result<()> {
    ensure_len("axpby", y.len(), x.len())?;
    for_each_block_mut(y, parallel, |offset, block| {
        let xs = &x[offset..offset + block.len()];
        for (yi, &xi) in block.iter_mut().zip(xs) {
            *yi = alpha * xi + beta * *yi;
        }
    });
    Ok(())
}

/// Compute the scaled vector addition: w = α * x + β * y
pub fn waxpby<T: Scalar>(
    alpha: T,
    x: &[T],
    beta: T,
    y: &[T],
    w: &mut [T],
    parallel: &ParallelConfig,
) -> Result<()> {
    ensure_len("waxpby", w.len(), x.len())?;
    ensure_len("waxpby", w.len(), y.len())?;
    for_each_block_mut(w, parallel, |offset, block| {
        let end = offset + block.len();
        for ((wi, &xi), &yi) in block.iter_mut().zip(&x[offset..end]).zip(&y[offset..end]) {
            *wi = alpha * xi + beta * yi;
        }
    });
    Ok(())
}

/// Borrow the elements of `v` as a slice, copying only if it is not contiguous
pub(crate) fn contiguous<T, S>(v: &ArrayBase<S, Ix1>) -> Cow<'_, [T]>
where
    T: Clone,
    S: Data<Elem = T>,
{
    match v.as_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(v.to_vec()),
    }
}
