//! Error types for sparse matrix construction, kernels and ingestion.
//!
//! Dimension and structure problems are hard errors surfaced through
//! [`SolverError`]. Non-convergence and numerical breakdown are not errors:
//! they are reported as a [`SolveStatus`](crate::SolveStatus) inside a
//! successful solve.

use thiserror::Error;

/// A structural defect found while validating CSR storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixDefect {
    /// `row_ptr` does not have `rows + 1` entries.
    #[error("row_ptr has {got} entries, expected {expected}")]
    RowPtrLength {
        /// `rows + 1`
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// `col_idx` and `values` disagree in length.
    #[error("col_idx has {col_idx} entries but values has {values}")]
    EntryLength {
        /// Length of `col_idx`
        col_idx: usize,
        /// Length of `values`
        values: usize,
    },

    /// `row_ptr[0]` is not zero.
    #[error("row_ptr must start at 0, found {found}")]
    RowPtrStart {
        /// The offending first offset
        found: usize,
    },

    /// `row_ptr[rows]` is not the number of stored entries.
    #[error("row_ptr must end at nnz = {nnz}, found {found}")]
    RowPtrEnd {
        /// Number of stored entries
        nnz: usize,
        /// The offending last offset
        found: usize,
    },

    /// `row_ptr` decreases between two consecutive rows.
    #[error("row_ptr decreases at row {row}: {start} > {end}")]
    RowPtrDecreasing {
        /// Row whose range is inverted
        row: usize,
        /// `row_ptr[row]`
        start: usize,
        /// `row_ptr[row + 1]`
        end: usize,
    },

    /// A stored entry refers to a row outside the matrix.
    #[error("entry {entry} has row {row}, but the matrix has {rows} rows")]
    RowOutOfRange {
        /// Position of the entry in the input
        entry: usize,
        /// The offending row index
        row: usize,
        /// Number of rows
        rows: usize,
    },

    /// A stored entry refers to a column outside the matrix.
    #[error("entry {entry} has column {col}, but the matrix has {cols} columns")]
    ColumnOutOfRange {
        /// Position of the entry in `col_idx`
        entry: usize,
        /// The offending column index
        col: usize,
        /// Number of columns
        cols: usize,
    },

    /// The row offsets for this many rows cannot be allocated.
    #[error("cannot allocate row offsets for {rows} rows")]
    TooManyRows {
        /// Requested number of rows
        rows: usize,
    },
}

/// Errors raised while reading a Matrix Market file.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The file could not be opened or read.
    #[error("failed to read matrix: {0}")]
    Io(#[from] std::io::Error),

    /// The `%%MatrixMarket` banner names a layout this reader does not handle.
    #[error("unsupported Matrix Market banner: {banner}")]
    UnsupportedFormat {
        /// The banner line as read
        banner: String,
    },

    /// The input ended before a `rows cols nnz` header line.
    #[error("missing size header line")]
    MissingHeader,

    /// The header line is not three non-negative integers.
    #[error("invalid size header on line {line}: {content:?}")]
    InvalidHeader {
        /// 1-based line number
        line: usize,
        /// The raw line
        content: String,
    },

    /// An entry line could not be parsed as `row col value`.
    #[error("invalid entry on line {line}: {content:?}")]
    InvalidEntry {
        /// 1-based line number
        line: usize,
        /// The raw line
        content: String,
    },

    /// An entry refers to a position outside the declared dimensions.
    #[error("entry ({row}, {col}) on line {line} is outside a {rows} x {cols} matrix")]
    IndexOutOfRange {
        /// 1-based line number
        line: usize,
        /// 1-based row index as written
        row: usize,
        /// 1-based column index as written
        col: usize,
        /// Declared rows
        rows: usize,
        /// Declared columns
        cols: usize,
    },

    /// Fewer entry lines than the header announced.
    #[error("expected {expected} entries, found {found}")]
    EntryCount {
        /// Entry count from the header
        expected: usize,
        /// Entries actually present
        found: usize,
    },

    /// Non-blank content after the last announced entry.
    #[error("unexpected data after the last entry on line {line}")]
    TrailingData {
        /// 1-based line number
        line: usize,
    },

    /// The assembled CSR storage failed validation.
    #[error("malformed matrix: {0}")]
    Matrix(#[from] MatrixDefect),
}

/// Errors that can occur in the sparse kernels and solvers.
#[derive(Debug, Error)]
pub enum SolverError {
    /// CSR storage violates its structural invariants.
    #[error("malformed matrix: {0}")]
    MalformedMatrix(#[from] MatrixDefect),

    /// Vector or matrix dimensions disagree at a kernel boundary.
    #[error("{operation}: dimension mismatch, expected {expected}, got {got}")]
    DimensionMismatch {
        /// The kernel or solver that rejected its inputs
        operation: &'static str,
        /// Required length
        expected: usize,
        /// Length supplied
        got: usize,
    },

    /// Loading the matrix failed.
    #[error("ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),
}

/// A specialized `Result` type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    /// Returns `true` if this is a dimension mismatch.
    pub fn is_dimension_error(&self) -> bool {
        matches!(self, SolverError::DimensionMismatch { .. })
    }

    /// Returns `true` if the matrix storage itself is invalid.
    ///
    /// This includes defects discovered while assembling an ingested file.
    pub fn is_matrix_error(&self) -> bool {
        matches!(
            self,
            SolverError::MalformedMatrix(_) | SolverError::Ingestion(IngestionError::Matrix(_))
        )
    }

    /// Returns `true` if this error came from reading a matrix.
    pub fn is_ingestion_error(&self) -> bool {
        matches!(self, SolverError::Ingestion(_))
    }
}

/// Fail with [`SolverError::DimensionMismatch`] unless `got == expected`.
#[inline]
pub(crate) fn ensure_len(operation: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(SolverError::DimensionMismatch {
            operation,
            expected,
            got,
        })
    }
}
