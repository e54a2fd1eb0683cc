//! Matrix Market coordinate reader
//!
//! Accepts the `coordinate` layout with an optional
//! `%%MatrixMarket matrix coordinate <field> <symmetry>` banner:
//!
//! ```text
//! %%MatrixMarket matrix coordinate real general
//! % comment
//! 3 3 4
//! 1 1 2.0
//! 2 2 3.0
//! 3 1 -1.0
//! 3 3 4.0
//! ```
//!
//! Indices in the file are 1-based. `%` comments and blank lines are skipped
//! anywhere. Entries keep their file order within a row and repeated
//! positions are kept as separate CSR entries.

use crate::error::IngestionError;
use crate::sparse::CsrMatrix;
use crate::traits::Scalar;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
}

#[derive(Debug, Clone, Copy)]
struct Banner {
    field: Field,
    symmetry: Symmetry,
}

impl Default for Banner {
    fn default() -> Self {
        Self {
            field: Field::Real,
            symmetry: Symmetry::General,
        }
    }
}

/// Load a sparse matrix from a Matrix Market (.mtx) file
pub fn read_matrix_market<T: Scalar, P: AsRef<Path>>(
    path: P,
) -> Result<CsrMatrix<T>, IngestionError> {
    let path = path.as_ref();
    log::debug!("Reading Matrix Market file {}", path.display());
    let file = File::open(path)?;
    parse_matrix_market(BufReader::new(file))
}

/// Parse a Matrix Market coordinate stream into CSR
pub fn parse_matrix_market<T: Scalar, R: BufRead>(
    reader: R,
) -> Result<CsrMatrix<T>, IngestionError> {
    let mut banner = Banner::default();
    let mut lines = reader.lines().enumerate();

    let (rows, cols, nnz) = loop {
        let Some((idx, line)) = lines.next() else {
            return Err(IngestionError::MissingHeader);
        };
        let line = line?;
        let trimmed = line.trim();
        if idx == 0 && trimmed.starts_with("%%") {
            banner = parse_banner(trimmed)?;
            continue;
        }
        if is_skippable(trimmed) {
            continue;
        }
        break parse_header(idx + 1, trimmed)?;
    };

    // Grown from the entries actually read; the header counts are untrusted
    let mut triplets: Vec<(usize, usize, T)> = Vec::new();
    let mut found = 0;

    for (idx, line) in lines {
        let line = line?;
        let trimmed = line.trim();
        if is_skippable(trimmed) {
            continue;
        }
        let line_no = idx + 1;
        if found == nnz {
            return Err(IngestionError::TrailingData { line: line_no });
        }

        let (row, col, value) = parse_entry(line_no, trimmed, banner.field)?;
        if row == 0 || col == 0 || row > rows || col > cols {
            return Err(IngestionError::IndexOutOfRange {
                line: line_no,
                row,
                col,
                rows,
                cols,
            });
        }

        triplets.push((row - 1, col - 1, value));
        if banner.symmetry == Symmetry::Symmetric && row != col {
            triplets.push((col - 1, row - 1, value));
        }
        found += 1;
    }

    if found < nnz {
        return Err(IngestionError::EntryCount {
            expected: nnz,
            found,
        });
    }

    Ok(CsrMatrix::assemble(rows, cols, &triplets)?)
}

fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with('%')
}

fn parse_banner(line: &str) -> Result<Banner, IngestionError> {
    let unsupported = || IngestionError::UnsupportedFormat {
        banner: line.to_string(),
    };
    let tokens: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
    let [tag, object, format, field, symmetry] = tokens.as_slice() else {
        return Err(unsupported());
    };
    if tag != "%%matrixmarket" || object != "matrix" || format != "coordinate" {
        return Err(unsupported());
    }
    let field = match field.as_str() {
        "real" | "double" => Field::Real,
        "integer" => Field::Integer,
        "pattern" => Field::Pattern,
        _ => return Err(unsupported()),
    };
    let symmetry = match symmetry.as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        _ => return Err(unsupported()),
    };
    Ok(Banner { field, symmetry })
}

fn parse_header(line_no: usize, line: &str) -> Result<(usize, usize, usize), IngestionError> {
    let invalid = || IngestionError::InvalidHeader {
        line: line_no,
        content: line.to_string(),
    };
    let mut tokens = line.split_whitespace().map(str::parse::<usize>);
    match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
        (Some(Ok(rows)), Some(Ok(cols)), Some(Ok(nnz)), None) => Ok((rows, cols, nnz)),
        _ => Err(invalid()),
    }
}

fn parse_entry<T: Scalar>(
    line_no: usize,
    line: &str,
    field: Field,
) -> Result<(usize, usize, T), IngestionError> {
    let invalid = || IngestionError::InvalidEntry {
        line: line_no,
        content: line.to_string(),
    };
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (row, col, value) = match (field, tokens.as_slice()) {
        (Field::Pattern, [row, col]) => (*row, *col, None),
        (Field::Real | Field::Integer, [row, col, value]) => (*row, *col, Some(*value)),
        _ => return Err(invalid()),
    };

    let row = row.parse::<usize>().map_err(|_| invalid())?;
    let col = col.parse::<usize>().map_err(|_| invalid())?;
    let value = match value {
        None => T::one(),
        Some(text) => {
            let parsed = text.parse::<f64>().map_err(|_| invalid())?;
            T::from_f64(parsed).ok_or_else(invalid)?
        }
    };
    Ok((row, col, value))
}
