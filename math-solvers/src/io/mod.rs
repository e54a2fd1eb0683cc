//! Matrix file input
//!
//! - [`matrix_market`]: coordinate-format `.mtx` reader producing a [`CsrMatrix`](crate::CsrMatrix)

pub mod matrix_market;

pub use matrix_market::{parse_matrix_market, read_matrix_market};
