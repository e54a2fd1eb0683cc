//! Core traits for the sparse kernels and solvers
//!
//! - [`Scalar`]: real floating-point element type (`f32`, `f64`)
//! - [`LinearOperator`]: anything that can compute `y = A x` into a caller buffer

use crate::error::Result;
use crate::parallel::ParallelConfig;
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::{Debug, Display, LowerExp};

/// Real scalar type usable in the kernels.
///
/// Blanket-implemented for every type with the required arithmetic, which in
/// practice means `f32` and `f64`.
pub trait Scalar:
    Float
    + NumAssign
    + FromPrimitive
    + ToPrimitive
    + Send
    + Sync
    + Debug
    + Display
    + LowerExp
    + 'static
{
}

impl<T> Scalar for T where
    T: Float
        + NumAssign
        + FromPrimitive
        + ToPrimitive
        + Send
        + Sync
        + Debug
        + Display
        + LowerExp
        + 'static
{
}

/// Trait for linear operators (matrices or matrix-free representations)
///
/// The solvers only need `y = A x`. Implementations write every element of `y`
/// and must not read its previous contents.
pub trait LinearOperator<T: Scalar>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    ///
    /// Fails with a dimension mismatch unless `x.len() == num_cols()` and
    /// `y.len() == num_rows()`.
    fn apply(&self, x: &[T], y: &mut [T], parallel: &ParallelConfig) -> Result<()>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}
