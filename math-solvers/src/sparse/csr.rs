//! Compressed Sparse Row (CSR) matrix format
//!
//! CSR format stores:
//! - `values`: stored entries in row-major order
//! - `col_idx`: column index for each value
//! - `row_ptr`: index into values/col_idx where each row starts
//!
//! Entries inside a row are kept in the order they were supplied and duplicate
//! columns are not merged; the matrix-vector product sums over the whole row,
//! so duplicates contribute additively.

use crate::blas_helpers::contiguous;
use crate::error::{MatrixDefect, Result, ensure_len};
use crate::parallel::{ParallelConfig, for_each_block_mut};
use crate::traits::{LinearOperator, Scalar};
use ndarray::{Array1, Array2};
use std::fmt;
use std::ops::Range;

/// Compressed Sparse Row (CSR) matrix format
///
/// Immutable once built: every constructor validates the storage, so
/// `row_ptr` is monotone, starts at zero, ends at `nnz`, and every column
/// index is in range.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T: Scalar> {
    num_rows: usize,
    num_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

/// Read-only view of the stored entries of one row
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a, T> {
    col_idx: &'a [usize],
    values: &'a [T],
}

impl<'a, T: Scalar> RowView<'a, T> {
    /// Number of stored entries in the row (duplicates counted separately)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the row stores no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column indices in storage order
    pub fn col_indices(&self) -> &'a [usize] {
        self.col_idx
    }

    /// Values in storage order
    pub fn values(&self) -> &'a [T] {
        self.values
    }

    /// The (col, value) pairs in storage order
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + 'a {
        self.col_idx.iter().copied().zip(self.values.iter().copied())
    }

    /// Σ value * x[col] over the row, in storage order
    ///
    /// `x` must cover every column of the matrix.
    #[inline]
    pub fn dot(&self, x: &[T]) -> T {
        self.col_idx
            .iter()
            .zip(self.values)
            .fold(T::zero(), |acc, (&j, &a)| acc + a * x[j])
    }
}

impl<T: Scalar> CsrMatrix<T> {
    /// Create a CSR matrix from raw components
    ///
    /// Fails with [`MatrixDefect`] if the arrays are inconsistent.
    pub fn from_raw_parts(
        num_rows: usize,
        num_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        Ok(Self::checked(num_rows, num_cols, row_ptr, col_idx, values)?)
    }

    /// Create a CSR matrix from COO (Coordinate) format triplets
    ///
    /// Triplets are (row, col, value). Entries keep their relative order
    /// within each row and duplicates are kept as separate entries.
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self> {
        Ok(Self::assemble(num_rows, num_cols, triplets)?)
    }

    fn checked(
        num_rows: usize,
        num_cols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> std::result::Result<Self, MatrixDefect> {
        let matrix = Self {
            num_rows,
            num_cols,
            row_ptr,
            col_idx,
            values,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Stable counting sort of triplets into CSR order
    pub(crate) fn assemble(
        num_rows: usize,
        num_cols: usize,
        triplets: &[(usize, usize, T)],
    ) -> std::result::Result<Self, MatrixDefect> {
        let mut row_ptr = Self::offsets(num_rows)?;
        for (entry, &(row, col, _)) in triplets.iter().enumerate() {
            if row >= num_rows {
                return Err(MatrixDefect::RowOutOfRange {
                    entry,
                    row,
                    rows: num_rows,
                });
            }
            if col >= num_cols {
                return Err(MatrixDefect::ColumnOutOfRange {
                    entry,
                    col,
                    cols: num_cols,
                });
            }
            row_ptr[row + 1] += 1;
        }
        for i in 0..num_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        let nnz = triplets.len();
        let mut next = row_ptr.clone();
        let mut col_idx = vec![0usize; nnz];
        let mut values = vec![T::zero(); nnz];
        for &(row, col, val) in triplets {
            let slot = next[row];
            col_idx[slot] = col;
            values[slot] = val;
            next[row] += 1;
        }

        Self::checked(num_rows, num_cols, row_ptr, col_idx, values)
    }

    /// Zeroed `row_ptr` for `num_rows` rows, failing instead of aborting when
    /// the row count cannot be allocated
    fn offsets(num_rows: usize) -> std::result::Result<Vec<usize>, MatrixDefect> {
        let len = num_rows
            .checked_add(1)
            .ok_or(MatrixDefect::TooManyRows { rows: num_rows })?;
        let mut row_ptr = Vec::new();
        row_ptr
            .try_reserve_exact(len)
            .map_err(|_| MatrixDefect::TooManyRows { rows: num_rows })?;
        row_ptr.resize(len, 0);
        Ok(row_ptr)
    }

    /// Create identity matrix in CSR format
    pub fn identity(n: usize) -> Self {
        Self::from_diagonal(&vec![T::one(); n])
    }

    /// Create diagonal matrix from a slice
    pub fn from_diagonal(diag: &[T]) -> Self {
        let n = diag.len();
        Self {
            num_rows: n,
            num_cols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: diag.to_vec(),
        }
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row offsets, `num_rows + 1` long
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    /// Column index of every stored entry
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// Value of every stored entry
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Check if the matrix is square
    pub fn is_square(&self) -> bool {
        self.num_rows == self.num_cols
    }

    /// Structural check: the three arrays have lengths `rows + 1`, `nnz`, `nnz`
    ///
    /// Does not look at offsets or column indices; see [`CsrMatrix::validate`].
    pub fn is_valid(&self) -> bool {
        let nnz = self.row_ptr.last().copied().unwrap_or(0);
        self.row_ptr.len() == self.num_rows + 1
            && self.col_idx.len() == nnz
            && self.values.len() == nnz
    }

    /// Full structural validation
    pub fn validate(&self) -> std::result::Result<(), MatrixDefect> {
        if self.row_ptr.len() != self.num_rows + 1 {
            return Err(MatrixDefect::RowPtrLength {
                expected: self.num_rows + 1,
                got: self.row_ptr.len(),
            });
        }
        if self.col_idx.len() != self.values.len() {
            return Err(MatrixDefect::EntryLength {
                col_idx: self.col_idx.len(),
                values: self.values.len(),
            });
        }
        if self.row_ptr[0] != 0 {
            return Err(MatrixDefect::RowPtrStart {
                found: self.row_ptr[0],
            });
        }
        let last = self.row_ptr[self.num_rows];
        if last != self.values.len() {
            return Err(MatrixDefect::RowPtrEnd {
                nnz: self.values.len(),
                found: last,
            });
        }
        if let Some(row) = self.row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(MatrixDefect::RowPtrDecreasing {
                row,
                start: self.row_ptr[row],
                end: self.row_ptr[row + 1],
            });
        }
        if let Some(entry) = self.col_idx.iter().position(|&c| c >= self.num_cols) {
            return Err(MatrixDefect::ColumnOutOfRange {
                entry,
                col: self.col_idx[entry],
                cols: self.num_cols,
            });
        }
        Ok(())
    }

    /// Get the range of indices in values/col_idx for a given row
    ///
    /// # Panics
    ///
    /// Panics if `row >= num_rows`.
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptr[row]..self.row_ptr[row + 1]
    }

    /// Bounded view of the entries stored for `row`
    ///
    /// # Panics
    ///
    /// Panics if `row >= num_rows`.
    pub fn row(&self, row: usize) -> RowView<'_, T> {
        let range = self.row_range(row);
        RowView {
            col_idx: &self.col_idx[range.clone()],
            values: &self.values[range],
        }
    }

    /// Views of every row, in order
    pub fn row_views(&self) -> impl Iterator<Item = RowView<'_, T>> + '_ {
        (0..self.num_rows).map(move |i| self.row(i))
    }

    /// Sequential sparse matrix-vector product: y = A * x
    ///
    /// Overwrites `y`. Requires `x.len() == num_cols` and `y.len() == num_rows`.
    pub fn spmv(&self, x: &[T], y: &mut [T]) -> Result<()> {
        self.spmv_parallel(x, y, &ParallelConfig::sequential())
    }

    /// Row-block parallel sparse matrix-vector product: y = A * x
    ///
    /// Rows are split into contiguous blocks; each worker owns the matching
    /// disjoint slice of `y`.
    pub fn spmv_parallel(&self, x: &[T], y: &mut [T], parallel: &ParallelConfig) -> Result<()> {
        ensure_len("spmv input", self.num_cols, x.len())?;
        ensure_len("spmv output", self.num_rows, y.len())?;
        for_each_block_mut(y, parallel, |first_row, block| {
            self.spmv_rows(first_row, x, block)
        });
        Ok(())
    }

    /// y[k] = row(first_row + k) · x for every k in the block
    #[inline]
    fn spmv_rows(&self, first_row: usize, x: &[T], y: &mut [T]) {
        for (k, yi) in y.iter_mut().enumerate() {
            *yi = self.row(first_row + k).dot(x);
        }
    }

    /// Matrix-vector product returning a new vector
    pub fn matvec(&self, x: &Array1<T>, parallel: &ParallelConfig) -> Result<Array1<T>> {
        let mut y = vec![T::zero(); self.num_rows];
        self.spmv_parallel(&contiguous(x), &mut y, parallel)?;
        Ok(Array1::from_vec(y))
    }

    /// Get element at (i, j), summing duplicates; returns 0 if not stored
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_rows`. An out-of-range `j` just returns 0.
    pub fn get(&self, i: usize, j: usize) -> T {
        self.row(i)
            .iter()
            .filter(|&(col, _)| col == j)
            .fold(T::zero(), |acc, (_, v)| acc + v)
    }

    /// Convert to dense matrix (for debugging/small matrices)
    ///
    /// Duplicate entries are summed.
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.num_rows, self.num_cols), T::zero());

        for (i, row) in self.row_views().enumerate() {
            for (j, val) in row.iter() {
                dense[[i, j]] += val;
            }
        }

        dense
    }
}

impl<T: Scalar> fmt::Display for CsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Matrix: {} x {}, nnz = {}",
            self.num_rows,
            self.num_cols,
            self.nnz()
        )
    }
}

impl<T: Scalar> LinearOperator<T> for CsrMatrix<T> {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn apply(&self, x: &[T], y: &mut [T], parallel: &ParallelConfig) -> Result<()> {
        self.spmv_parallel(x, y, parallel)
    }
}
