//! Sparse matrix structures (CSR format)
//!
//! This module provides Compressed Sparse Row (CSR) storage and the sparse
//! matrix-vector product in sequential and row-block parallel form.

mod csr;

pub use csr::{CsrMatrix, RowView};
