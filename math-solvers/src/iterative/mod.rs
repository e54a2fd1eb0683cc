//! Iterative solvers for linear systems
//!
//! - [`bicgstab`]: BiCGSTAB for general non-symmetric sparse systems

mod bicgstab;

pub use bicgstab::{
    BiCgstabConfig, BiCgstabSolution, BreakdownQuantity, SolveStatus, bicgstab,
    bicgstab_with_guess, residual_norm,
};
