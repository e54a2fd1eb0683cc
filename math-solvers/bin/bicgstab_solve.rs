use clap::Parser;
use math_sparse_solvers::{
    BiCgstabConfig, CsrMatrix, ParallelConfig, SolveStatus, bicgstab, read_matrix_market,
};
use ndarray::Array1;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "bicgstab_solve",
    about = "Solve A x = b for a Matrix Market matrix with BiCGSTAB"
)]
struct Cli {
    /// Path to a Matrix Market coordinate file
    matrix: PathBuf,

    /// Absolute tolerance on the residual 2-norm
    #[arg(long, default_value_t = 1e-8)]
    tol: f64,

    /// Maximum number of BiCGSTAB iterations
    #[arg(long, default_value_t = 5000)]
    max_iter: usize,

    /// Value of every entry of the right-hand side b
    #[arg(long, default_value_t = 1.0)]
    rhs_value: f64,

    /// Number of worker threads (defaults to all available cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Run every kernel on the calling thread
    #[arg(long)]
    sequential: bool,

    /// Log the residual every N iterations (0 = never)
    #[arg(long, default_value_t = 0)]
    print_interval: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Cli::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if args.threads == Some(0) {
        eprintln!("Error: --threads must be at least 1.");
        process::exit(2);
    }
    if !(args.tol.is_finite() && args.tol >= 0.0) {
        eprintln!("Error: --tol must be a finite non-negative number; got {}", args.tol);
        process::exit(2);
    }

    #[cfg(feature = "rayon")]
    if let Some(threads) = args.threads
        && let Err(err) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
    {
        log::warn!("Could not configure the thread pool: {err}");
    }

    let matrix: CsrMatrix<f64> = match read_matrix_market(&args.matrix) {
        Ok(matrix) => matrix,
        Err(err) => {
            eprintln!("Error: failed to read {}: {err}", args.matrix.display());
            process::exit(3);
        }
    };
    log::info!("{matrix}");

    let parallel = if args.sequential {
        ParallelConfig::sequential()
    } else {
        ParallelConfig {
            num_workers: args.threads,
            ..ParallelConfig::default()
        }
    };
    let config = BiCgstabConfig {
        max_iterations: args.max_iter,
        tolerance: args.tol,
        print_interval: args.print_interval,
        parallel,
        ..BiCgstabConfig::default()
    };

    let b = Array1::from_elem(matrix.num_rows(), args.rhs_value);

    let start = Instant::now();
    let solution = match bicgstab(&matrix, &b, &config) {
        Ok(solution) => solution,
        Err(err) => {
            eprintln!("Error: solve failed: {err}");
            process::exit(4);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "{},{:.6},{:e}",
        solution.iterations, elapsed, solution.residual_norm
    );

    match solution.status {
        SolveStatus::Converged => {}
        SolveStatus::MaxIterationsExceeded => {
            eprintln!("Warning: {}", solution.status);
        }
        SolveStatus::Diverged { .. } | SolveStatus::NumericalBreakdown { .. } => {
            eprintln!("Error: {}", solution.status);
            process::exit(1);
        }
    }
}
