//! BiCGSTAB (Bi-Conjugate Gradient Stabilized) solver
//!
//! BiCGSTAB is a Krylov subspace method for non-symmetric systems. Every
//! denominator of the recurrence is checked before it is divided by, so a
//! vanishing inner product ends the solve with
//! [`SolveStatus::NumericalBreakdown`] instead of spreading NaN into `x`.

use crate::blas_helpers::{axpby, axpy, contiguous, dot, norm2, waxpby};
use crate::error::{Result, SolverError, ensure_len};
use crate::parallel::ParallelConfig;
use crate::traits::{LinearOperator, Scalar};
use ndarray::Array1;
use std::fmt;

/// BiCGSTAB solver configuration
#[derive(Debug, Clone)]
pub struct BiCgstabConfig<R> {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Absolute tolerance on ||b - Ax||_2
    pub tolerance: R,
    /// Denominators with magnitude at or below this count as breakdown
    pub breakdown_tolerance: R,
    /// Log progress every N iterations (0 = no output)
    pub print_interval: usize,
    /// Block partitioning for SpMV and the vector kernels
    pub parallel: ParallelConfig,
}

impl Default for BiCgstabConfig<f64> {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-8,
            breakdown_tolerance: 1e-30,
            print_interval: 0,
            parallel: ParallelConfig::default(),
        }
    }
}

impl<R: Scalar> BiCgstabConfig<R> {
    /// Configuration with the given tolerance and iteration budget
    pub fn new(tolerance: R, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            tolerance,
            breakdown_tolerance: R::from_f64(1e-30).unwrap_or_else(R::min_positive_value),
            print_interval: 0,
            parallel: ParallelConfig::default(),
        }
    }
}

/// The inner product or step length that vanished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownQuantity {
    /// (r̂₀, r): the shadow residual became orthogonal to the residual
    Rho,
    /// (r̂₀, v): denominator of α
    ShadowResidualDotV,
    /// (t, t): denominator of ω
    TDotT,
    /// ω itself; the next β divides by it
    Omega,
}

impl fmt::Display for BreakdownQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BreakdownQuantity::Rho => "(r0, r)",
            BreakdownQuantity::ShadowResidualDotV => "(r0, v)",
            BreakdownQuantity::TDotT => "(t, t)",
            BreakdownQuantity::Omega => "omega",
        };
        f.write_str(name)
    }
}

/// Terminal state of a BiCGSTAB solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveStatus<R> {
    /// ||r||_2 reached the tolerance
    Converged,
    /// The iteration budget ran out first
    MaxIterationsExceeded,
    /// The residual norm stopped being finite
    Diverged {
        /// Iteration at which the non-finite residual was observed
        iteration: usize,
    },
    /// A denominator vanished; `x` holds the last finite iterate
    NumericalBreakdown {
        /// Iteration in which the breakdown was detected (0-based)
        iteration: usize,
        /// Which quantity vanished
        quantity: BreakdownQuantity,
        /// Its value
        value: R,
    },
}

impl<R: Scalar> fmt::Display for SolveStatus<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Converged => f.write_str("converged"),
            SolveStatus::MaxIterationsExceeded => f.write_str("maximum iterations exceeded"),
            SolveStatus::Diverged { iteration } => {
                write!(f, "diverged at iteration {iteration}")
            }
            SolveStatus::NumericalBreakdown {
                iteration,
                quantity,
                value,
            } => write!(
                f,
                "numerical breakdown at iteration {iteration}: {quantity} = {value:e}"
            ),
        }
    }
}

/// BiCGSTAB solver result
#[derive(Debug, Clone)]
pub struct BiCgstabSolution<T: Scalar> {
    /// Solution vector
    pub x: Array1<T>,
    /// Number of completed iterations
    pub iterations: usize,
    /// Final ||b - Ax||_2 as tracked by the recurrence
    pub residual_norm: T,
    /// How the solve ended
    pub status: SolveStatus<T>,
}

impl<T: Scalar> BiCgstabSolution<T> {
    /// Whether convergence was achieved
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// Solve Ax = b using the BiCGSTAB method, starting from x = 0
pub fn bicgstab<T, A>(
    operator: &A,
    b: &Array1<T>,
    config: &BiCgstabConfig<T>,
) -> Result<BiCgstabSolution<T>>
where
    T: Scalar,
    A: LinearOperator<T>,
{
    let x0 = Array1::from_elem(operator.num_cols(), T::zero());
    bicgstab_with_guess(operator, b, &x0, config)
}

/// Solve Ax = b using the BiCGSTAB method with an initial guess
pub fn bicgstab_with_guess<T, A>(
    operator: &A,
    b: &Array1<T>,
    x0: &Array1<T>,
    config: &BiCgstabConfig<T>,
) -> Result<BiCgstabSolution<T>>
where
    T: Scalar,
    A: LinearOperator<T>,
{
    let n = operator.num_rows();
    if !operator.is_square() {
        return Err(SolverError::DimensionMismatch {
            operation: "bicgstab operator columns",
            expected: n,
            got: operator.num_cols(),
        });
    }
    ensure_len("bicgstab right-hand side", n, b.len())?;
    ensure_len("bicgstab initial guess", n, x0.len())?;

    let par = &config.parallel;
    let b = contiguous(b);
    let mut x = x0.to_vec();

    // r = b - A x
    let mut r = vec![T::zero(); n];
    operator.apply(&x, &mut r, par)?;
    axpby(T::one(), &b, -T::one(), &mut r, par)?;

    // Shadow residual, fixed for the whole solve
    let r0 = r.clone();

    let mut rho = T::one();
    let mut alpha = T::one();
    let mut omega = T::one();

    let mut p = vec![T::zero(); n];
    let mut v = vec![T::zero(); n];
    let mut s = vec![T::zero(); n];
    let mut t = vec![T::zero(); n];

    let mut residual = norm2(&r, par)?;
    let mut iteration = 0;

    log::debug!(
        "BiCGSTAB start: n = {}, initial residual = {:.6e}, tolerance = {:.3e}",
        n,
        residual,
        config.tolerance
    );

    let breakdown = |value: T| !value.is_finite() || value.abs() <= config.breakdown_tolerance;

    let status = loop {
        if !residual.is_finite() {
            break SolveStatus::Diverged { iteration };
        }
        if residual <= config.tolerance {
            break SolveStatus::Converged;
        }
        if iteration >= config.max_iterations {
            break SolveStatus::MaxIterationsExceeded;
        }
        if breakdown(omega) {
            break SolveStatus::NumericalBreakdown {
                iteration,
                quantity: BreakdownQuantity::Omega,
                value: omega,
            };
        }

        let rho_new = dot(&r0, &r, par)?;
        if breakdown(rho_new) {
            break SolveStatus::NumericalBreakdown {
                iteration,
                quantity: BreakdownQuantity::Rho,
                value: rho_new,
            };
        }

        let beta = (rho_new / rho) * (alpha / omega);

        // p = r + beta * (p - omega * v)
        axpy(-omega, &v, &mut p, par)?;
        axpby(T::one(), &r, beta, &mut p, par)?;

        // v = A * p
        operator.apply(&p, &mut v, par)?;

        let r0v = dot(&r0, &v, par)?;
        if breakdown(r0v) {
            break SolveStatus::NumericalBreakdown {
                iteration,
                quantity: BreakdownQuantity::ShadowResidualDotV,
                value: r0v,
            };
        }
        alpha = rho_new / r0v;
        rho = rho_new;

        // s = r - alpha * v
        waxpby(T::one(), &r, -alpha, &v, &mut s, par)?;

        // Half step already good enough: x += alpha * p, r = s
        let s_norm = norm2(&s, par)?;
        if s_norm <= config.tolerance {
            axpy(alpha, &p, &mut x, par)?;
            std::mem::swap(&mut r, &mut s);
            residual = s_norm;
            iteration += 1;
            continue;
        }

        // t = A * s
        operator.apply(&s, &mut t, par)?;

        // omega = (t, s) / (t, t)
        let tt = dot(&t, &t, par)?;
        if breakdown(tt) {
            break SolveStatus::NumericalBreakdown {
                iteration,
                quantity: BreakdownQuantity::TDotT,
                value: tt,
            };
        }
        omega = dot(&t, &s, par)? / tt;

        // x = x + alpha * p + omega * s
        axpy(alpha, &p, &mut x, par)?;
        axpy(omega, &s, &mut x, par)?;

        // r = s - omega * t
        waxpby(T::one(), &s, -omega, &t, &mut r, par)?;

        iteration += 1;
        residual = norm2(&r, par)?;

        if config.print_interval > 0 && iteration % config.print_interval == 0 {
            log::info!(
                "BiCGSTAB iteration {}: residual = {:.6e}",
                iteration,
                residual
            );
        }
    };

    match status {
        SolveStatus::Converged => log::debug!(
            "BiCGSTAB converged after {} iterations, residual = {:.6e}",
            iteration,
            residual
        ),
        SolveStatus::MaxIterationsExceeded => log::debug!(
            "BiCGSTAB stopped after {} iterations, residual = {:.6e}",
            iteration,
            residual
        ),
        _ => log::warn!("BiCGSTAB {status}, residual = {residual:.6e}"),
    }

    Ok(BiCgstabSolution {
        x: Array1::from_vec(x),
        iterations: iteration,
        residual_norm: residual,
        status,
    })
}

/// Convenience: true residual ||b - Ax||_2 computed from scratch
pub fn residual_norm<T, A>(
    operator: &A,
    b: &Array1<T>,
    x: &Array1<T>,
    parallel: &ParallelConfig,
) -> Result<T>
where
    T: Scalar,
    A: LinearOperator<T>,
{
    ensure_len("residual right-hand side", operator.num_rows(), b.len())?;
    let mut r = vec![T::zero(); operator.num_rows()];
    operator.apply(&contiguous(x), &mut r, parallel)?;
    axpby(T::one(), &contiguous(b), -T::one(), &mut r, parallel)?;
    norm2(&r, parallel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::CsrMatrix;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn config(tolerance: f64, max_iterations: usize) -> BiCgstabConfig<f64> {
        BiCgstabConfig {
            max_iterations,
            tolerance,
            ..BiCgstabConfig::default()
        }
    }

    #[test]
    fn test_bicgstab_simple() {
        let a = CsrMatrix::from_triplets(
            2,
            2,
            &[(0, 0, 4.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)],
        )
        .unwrap();
        let b = array![1.0, 2.0];

        let solution = bicgstab(&a, &b, &config(1e-10, 100)).unwrap();

        assert!(solution.converged(), "BiCGSTAB should converge");

        let error = residual_norm(&a, &b, &solution.x, &ParallelConfig::sequential()).unwrap();
        assert!(error < 1e-8, "Solution should satisfy Ax = b");
    }

    #[test]
    fn test_identity_converges_in_one_iteration() {
        let a = CsrMatrix::<f64>::identity(3);
        let b = array![1.0, 2.0, 3.0];

        let solution = bicgstab(&a, &b, &config(1e-10, 100)).unwrap();

        assert_eq!(solution.status, SolveStatus::Converged);
        assert_eq!(solution.iterations, 1);
        assert_relative_eq!(solution.residual_norm, 0.0, epsilon = 1e-12);
        for (xi, bi) in solution.x.iter().zip(b.iter()) {
            assert_relative_eq!(*xi, *bi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_diagonal_exact_solution() {
        let a = CsrMatrix::from_diagonal(&[2.0, 4.0]);
        let b = array![4.0, 8.0];

        for tol in [1e-6, 1e-10, 1e-13] {
            let solution = bicgstab(&a, &b, &config(tol, 50)).unwrap();
            assert!(solution.converged());
            assert!(solution.iterations <= 3, "took {}", solution.iterations);
            assert_relative_eq!(solution.x[0], 2.0, epsilon = 1e-10);
            assert_relative_eq!(solution.x[1], 2.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_breakdown_on_orthogonal_shadow_residual() {
        // Permutation [[0, 1], [1, 0]] with b = e1: v = A r0 = e2 is orthogonal to r0
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 1, 1.0), (1, 0, 1.0)]).unwrap();
        let b = array![1.0, 0.0];

        let solution = bicgstab(&a, &b, &config(1e-10, 100)).unwrap();

        assert_eq!(
            solution.status,
            SolveStatus::NumericalBreakdown {
                iteration: 0,
                quantity: BreakdownQuantity::ShadowResidualDotV,
                value: 0.0,
            }
        );
        assert_eq!(solution.iterations, 0);
        assert!(solution.x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_breakdown_on_vanishing_t() {
        // s = [-1, 1] lies in the null space of [[1, 1], [0, 0]], so t = A s = 0
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (0, 1, 1.0)]).unwrap();
        let b = array![1.0, 1.0];

        let solution = bicgstab(&a, &b, &config(1e-10, 100)).unwrap();

        assert_eq!(
            solution.status,
            SolveStatus::NumericalBreakdown {
                iteration: 0,
                quantity: BreakdownQuantity::TDotT,
                value: 0.0,
            }
        );
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.x, array![0.0, 0.0]);
    }

    #[test]
    fn test_breakdown_on_zero_omega() {
        // First step: s = [0, -1], t = A s = [1, 0], so (t, s) = 0 and omega = 0
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, -1.0), (0, 1, -1.0), (1, 0, -1.0)])
            .unwrap();
        let b = array![1.0, 0.0];

        let solution = bicgstab(&a, &b, &config(1e-10, 100)).unwrap();

        assert_eq!(
            solution.status,
            SolveStatus::NumericalBreakdown {
                iteration: 1,
                quantity: BreakdownQuantity::Omega,
                value: 0.0,
            }
        );
        assert_eq!(solution.iterations, 1);
        assert_relative_eq!(solution.x[0], -1.0, epsilon = 1e-15);
        assert_relative_eq!(solution.x[1], 0.0, epsilon = 1e-15);
        assert_relative_eq!(solution.residual_norm, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_breakdown_on_orthogonal_residual() {
        // After one step r = [1/3, -2/3, -1/3], which is orthogonal to r0 = [1, 0, 1]
        let a = CsrMatrix::from_triplets(
            3,
            3,
            &[
                (0, 0, -1.0),
                (0, 1, -1.0),
                (0, 2, -1.0),
                (1, 0, -1.0),
                (1, 1, -1.0),
                (1, 2, -1.0),
                (2, 0, -1.0),
                (2, 1, 1.0),
                (2, 2, -1.0),
            ],
        )
        .unwrap();
        let b = array![1.0, 0.0, 1.0];

        let solution = bicgstab(&a, &b, &config(1e-10, 100)).unwrap();

        match solution.status {
            SolveStatus::NumericalBreakdown {
                iteration,
                quantity,
                value,
            } => {
                assert_eq!(iteration, 1);
                assert_eq!(quantity, BreakdownQuantity::Rho);
                assert_eq!(value, 0.0);
            }
            other => panic!("expected breakdown, got {other}"),
        }
        assert_eq!(solution.iterations, 1);
        assert_relative_eq!(solution.x[0], -0.5, epsilon = 1e-15);
        assert_relative_eq!(solution.x[1], 1.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(solution.x[2], -0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_zero_iterations_leaves_guess_untouched() {
        let a = CsrMatrix::from_diagonal(&[2.0, 4.0]);
        let b = array![4.0, 8.0];
        let x0 = array![0.5, -1.0];

        let solution = bicgstab_with_guess(&a, &b, &x0, &config(1e-10, 0)).unwrap();

        assert_eq!(solution.status, SolveStatus::MaxIterationsExceeded);
        assert_eq!(solution.iterations, 0);
        assert_eq!(solution.x, x0);
    }

    #[test]
    fn test_zero_iterations_with_exact_guess_converges() {
        let a = CsrMatrix::from_diagonal(&[2.0, 4.0]);
        let b = array![4.0, 8.0];
        let x0 = array![2.0, 2.0];

        let solution = bicgstab_with_guess(&a, &b, &x0, &config(1e-10, 0)).unwrap();

        assert_eq!(solution.status, SolveStatus::Converged);
        assert_eq!(solution.x, x0);
    }

    #[test]
    fn test_zero_rhs_converges_immediately() {
        let a = CsrMatrix::from_diagonal(&[1.0, 5.0, 9.0]);
        let b = Array1::zeros(3);

        let solution = bicgstab(&a, &b, &BiCgstabConfig::default()).unwrap();

        assert_eq!(solution.status, SolveStatus::Converged);
        assert_eq!(solution.iterations, 0);
    }

    #[test]
    fn test_max_iterations_exceeded() {
        let n = 30;
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
            }
        }
        let a = CsrMatrix::from_triplets(n, n, &triplets).unwrap();
        let b = Array1::from_elem(n, 1.0);

        let solution = bicgstab(&a, &b, &config(1e-14, 2)).unwrap();

        assert_eq!(solution.status, SolveStatus::MaxIterationsExceeded);
        assert_eq!(solution.iterations, 2);
        assert!(!solution.converged());
    }

    #[test]
    fn test_non_finite_matrix_diverges() {
        let a = CsrMatrix::from_diagonal(&[1.0, f64::NAN]);
        let b = array![1.0, 1.0];

        let solution = bicgstab(&a, &b, &config(1e-10, 10)).unwrap();

        assert_eq!(solution.status, SolveStatus::Diverged { iteration: 0 });
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = CsrMatrix::<f64>::identity(3);
        let err = bicgstab(&a, &array![1.0, 2.0], &BiCgstabConfig::default()).unwrap_err();
        assert!(err.is_dimension_error());

        let rect = CsrMatrix::<f64>::from_triplets(2, 3, &[(0, 0, 1.0)]).unwrap();
        let err = bicgstab(&rect, &array![1.0, 2.0], &BiCgstabConfig::default()).unwrap_err();
        assert!(err.is_dimension_error());

        let err = bicgstab_with_guess(
            &a,
            &array![1.0, 2.0, 3.0],
            &array![0.0],
            &BiCgstabConfig::default(),
        )
        .unwrap_err();
        assert!(err.is_dimension_error());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let n = 64;
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 4.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.5));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -0.5));
            }
        }
        let a = CsrMatrix::from_triplets(n, n, &triplets).unwrap();
        let b = Array1::from_shape_fn(n, |i| 1.0 + (i % 7) as f64);

        let mut seq_config = config(1e-10, 200);
        seq_config.parallel = ParallelConfig::sequential();
        let expected = bicgstab(&a, &b, &seq_config).unwrap();
        assert!(expected.converged());

        for workers in [2, 3, 8] {
            let mut par_config = config(1e-10, 200);
            par_config.parallel = ParallelConfig::with_workers(workers);
            let solution = bicgstab(&a, &b, &par_config).unwrap();
            assert!(solution.converged());
            for (xi, ei) in solution.x.iter().zip(expected.x.iter()) {
                assert_relative_eq!(*xi, *ei, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_f32_solve() {
        let a = CsrMatrix::<f32>::from_diagonal(&[2.0, 4.0]);
        let b = array![4.0_f32, 8.0];

        let solution = bicgstab(&a, &b, &BiCgstabConfig::new(1e-5_f32, 20)).unwrap();

        assert!(solution.converged());
        assert_relative_eq!(solution.x[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(solution.x[1], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_status_display() {
        let status = SolveStatus::NumericalBreakdown {
            iteration: 3,
            quantity: BreakdownQuantity::TDotT,
            value: 0.0_f64,
        };
        assert_eq!(
            status.to_string(),
            "numerical breakdown at iteration 3: (t, t) = 0e0"
        );
        assert_eq!(SolveStatus::<f64>::Converged.to_string(), "converged");
    }
}
