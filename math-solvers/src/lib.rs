//! Sparse linear solvers on CSR matrices
//!
//! This crate solves `A x = b` for square, possibly nonsymmetric sparse `A`
//! with the BiCGSTAB method.
//!
//! # Features
//!
//! - **Sparse Matrices**: CSR format with validation and row views
//! - **Vector Kernels**: dot, norm2, axpy, scal over static contiguous blocks
//! - **SpMV**: one algorithm, run sequentially or split into row blocks
//! - **BiCGSTAB**: reports convergence, iteration limits and breakdowns
//! - **Matrix Market**: reader for coordinate `.mtx` files
//!
//! The `rayon` feature (on by default) runs the blocks on the rayon pool.
//!
//! # Example
//!
//! ```
//! use math_sparse_solvers::{BiCgstabConfig, CsrMatrix, bicgstab};
//! use ndarray::array;
//!
//! let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)])?;
//! let b = array![1.0, 2.0];
//!
//! let solution = bicgstab(&a, &b, &BiCgstabConfig::default())?;
//! assert!(solution.converged());
//! # Ok::<(), math_sparse_solvers::SolverError>(())
//! ```

pub mod blas_helpers;
pub mod error;
pub mod io;
pub mod iterative;
pub mod parallel;
pub mod sparse;
pub mod traits;

// Re-export main types
pub use error::{IngestionError, MatrixDefect, Result, SolverError};
pub use parallel::ParallelConfig;
pub use sparse::{CsrMatrix, RowView};
pub use traits::{LinearOperator, Scalar};

// Re-export kernels
pub use blas_helpers::{axpby, axpy, dot, norm2, scal, waxpby};

// Re-export the solver
pub use iterative::{
    BiCgstabConfig, BiCgstabSolution, BreakdownQuantity, SolveStatus, bicgstab,
    bicgstab_with_guess, residual_norm,
};

pub use io::{parse_matrix_market, read_matrix_market};
