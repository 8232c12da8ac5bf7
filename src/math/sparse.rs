//! Sparse matrix utilities for global assembly
//!
//! The global stiffness pattern is fixed once the DoFs are numbered, so the
//! matrix is built once from the element connectivity and afterwards only its
//! values are overwritten. Triplets are scattered into the existing entries with
//! a binary search per row, summing duplicates.

use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeSet;

use crate::error::{SolverError, SolverResult};

/// Collects the (row, col) structure of a sparse matrix
pub struct PatternBuilder {
    ncols: usize,
    rows: Vec<BTreeSet<usize>>,
}

impl PatternBuilder {
    /// Square `size x size` pattern
    pub fn new(size: usize) -> Self {
        Self::with_shape(size, size)
    }

    pub fn with_shape(nrows: usize, ncols: usize) -> Self {
        Self {
            ncols,
            rows: vec![BTreeSet::new(); nrows],
        }
    }

    /// Register every pairing of `dofs` (an element's global equation numbers)
    pub fn add_connectivity(&mut self, dofs: &[usize]) {
        for &row in dofs {
            for &col in dofs {
                self.add(row, col);
            }
        }
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize) {
        if row < self.rows.len() && col < self.ncols {
            self.rows[row].insert(col);
        }
    }

    /// Get non-zero count
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(BTreeSet::len).sum()
    }

    /// Build a CSR matrix with this pattern and all values zero
    pub fn to_csr(&self) -> SolverResult<CsrMatrix<f64>> {
        let nrows = self.rows.len();
        let mut offsets = Vec::with_capacity(nrows + 1);
        let mut indices = Vec::with_capacity(self.nnz());
        offsets.push(0);
        for row in &self.rows {
            indices.extend(row.iter().copied());
            offsets.push(indices.len());
        }
        let nnz = indices.len();
        let pattern =
            SparsityPattern::try_from_offsets_and_indices(nrows, self.ncols, offsets, indices)
                .map_err(|e| SolverError::Assembly(format!("invalid sparsity pattern: {e}")))?;
        CsrMatrix::try_from_pattern_and_values(pattern, vec![0.0; nnz])
            .map_err(|e| SolverError::Assembly(format!("invalid CSR matrix: {e}")))
    }
}

/// Zero every stored value of `matrix`, keeping its pattern
pub fn clear_values(matrix: &mut CsrMatrix<f64>) {
    matrix.values_mut().fill(0.0);
}

/// Sum `(row, col, value)` triplets into the existing entries of `matrix`.
///
/// `row_offset` is subtracted from every row index, which lets a partition
/// hold only its own block of rows.
pub fn scatter_triplets(
    matrix: &mut CsrMatrix<f64>,
    triplets: &[(usize, usize, f64)],
    row_offset: usize,
) -> SolverResult<()> {
    let nrows = matrix.nrows();
    let (offsets, cols, values) = matrix.csr_data_mut();
    for &(row, col, value) in triplets {
        let local_row = row
            .checked_sub(row_offset)
            .filter(|&r| r < nrows)
            .ok_or_else(|| SolverError::Assembly(format!("row {row} is outside this matrix")))?;
        let (start, end) = (offsets[local_row], offsets[local_row + 1]);
        let position = cols[start..end].binary_search(&col).map_err(|_| {
            SolverError::Assembly(format!("entry ({row}, {col}) is not in the sparsity pattern"))
        })?;
        values[start + position] += value;
    }
    Ok(())
}

/// Squared Euclidean norm accumulated with Kahan compensation
pub fn kahan_norm_squared(values: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for &v in values {
        let y = v * v - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pattern_builder() {
        let mut builder = PatternBuilder::new(4);
        builder.add_connectivity(&[0, 1]);
        builder.add_connectivity(&[1, 2]);
        builder.add(3, 3);

        let csr = builder.to_csr().unwrap();
        assert_eq!(csr.nnz(), 4 + 3 + 1);
        assert!(csr.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_scatter_sums_duplicates_and_clears() {
        let mut builder = PatternBuilder::new(2);
        builder.add_connectivity(&[0, 1]);
        let mut csr = builder.to_csr().unwrap();

        let triplets = [(0, 0, 4.0), (0, 0, 1.0), (1, 0, -1.0), (1, 1, 3.0)];
        scatter_triplets(&mut csr, &triplets, 0).unwrap();
        let dense = nalgebra_sparse::convert::serial::convert_csr_dense(&csr);
        assert_relative_eq!(dense[(0, 0)], 5.0);
        assert_relative_eq!(dense[(1, 0)], -1.0);

        clear_values(&mut csr);
        assert!(csr.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_scatter_rejects_entries_outside_pattern() {
        let mut builder = PatternBuilder::new(3);
        builder.add_connectivity(&[0, 1]);
        builder.add(2, 2);
        let mut csr = builder.to_csr().unwrap();
        assert!(scatter_triplets(&mut csr, &[(0, 2, 1.0)], 0).is_err());
    }

    #[test]
    fn test_kahan_norm_matches_plain_sum() {
        let values = [3.0, 4.0, 12.0];
        assert_relative_eq!(kahan_norm_squared(&values).sqrt(), 13.0);
    }
}
