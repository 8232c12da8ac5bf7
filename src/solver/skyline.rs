//! Skyline Cholesky backend for symmetric positive definite stiffness
//!
//! Only the lower triangle is stored, row by row from the first structural
//! non-zero to the diagonal. The profile depends only on the sparsity
//! pattern, so it is analysed on the first factorisation and reused for as
//! long as the pattern stays the same.

use log::debug;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;

use super::LinearSolver;
use crate::error::{SolverError, SolverResult};
use crate::math::DVec;

/// Pivots smaller than this fraction of the original diagonal are treated
/// as zero
const PIVOT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Default)]
pub struct SkylineSolver {
    pattern: Option<SparsityPattern>,
    // Distance from the diagonal to the first non-zero of each row
    heights: Vec<usize>,
    skyline: Vec<Vec<f64>>,
    factorized: bool,
}

impl SkylineSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the profile of `k` is already known
    pub fn has_profile_for(&self, k: &CsrMatrix<f64>) -> bool {
        self.pattern.as_ref() == Some(k.pattern())
    }

    fn analyse(&mut self, k: &CsrMatrix<f64>) {
        let size = k.nrows();
        let mut heights = vec![0usize; size];
        for (row, col, _) in k.triplet_iter() {
            if col < row {
                heights[row] = heights[row].max(row - col);
            }
        }
        let profile: usize = heights.iter().map(|h| h + 1).sum();
        debug!("Skyline profile analysed: {size} equations, {profile} stored entries");

        self.skyline = heights.iter().map(|&h| vec![0.0; h + 1]).collect();
        self.heights = heights;
        self.pattern = Some(k.pattern().clone());
    }

    #[inline]
    fn start(&self, row: usize) -> usize {
        row - self.heights[row]
    }

    /// Entry `(row, col)` of the lower triangle, `col <= row`
    #[inline]
    fn get(&self, row: usize, col: usize) -> f64 {
        let start = self.start(row);
        if col < start {
            0.0
        } else {
            self.skyline[row][col - start]
        }
    }
}

impl LinearSolver for SkylineSolver {
    fn name(&self) -> &str {
        "skyline-Cholesky"
    }

    fn factorize(&mut self, k: &CsrMatrix<f64>) -> SolverResult<()> {
        if k.nrows() != k.ncols() {
            return Err(SolverError::Assembly(format!(
                "stiffness matrix is {}x{}, expected a square matrix",
                k.nrows(),
                k.ncols()
            )));
        }
        if !self.has_profile_for(k) {
            self.analyse(k);
        }
        self.factorized = false;

        for row in &mut self.skyline {
            row.fill(0.0);
        }
        for (row, col, &value) in k.triplet_iter() {
            if col <= row {
                let start = self.start(row);
                self.skyline[row][col - start] += value;
            }
        }

        for i in 0..self.skyline.len() {
            let start_i = self.start(i);
            let hi = self.heights[i];

            for j in start_i..i {
                let start = start_i.max(self.start(j));
                let mut sum = 0.0;
                for m in start..j {
                    sum += self.get(i, m) * self.get(j, m);
                }
                let diag_j = self.skyline[j][self.heights[j]];
                self.skyline[i][j - start_i] = (self.skyline[i][j - start_i] - sum) / diag_j;
            }

            let original = self.skyline[i][hi];
            let sum: f64 = self.skyline[i][..hi].iter().map(|v| v * v).sum();
            let diag = original - sum;
            if !diag.is_finite() || diag <= PIVOT_TOLERANCE * original.abs() {
                debug!("Non-positive pivot {diag:e} at equation {i}");
                return Err(SolverError::SingularMatrix);
            }
            self.skyline[i][hi] = diag.sqrt();
        }

        self.factorized = true;
        Ok(())
    }

    fn solve(&self, b: &DVec) -> SolverResult<DVec> {
        if !self.factorized {
            return Err(SolverError::InvalidInput(
                "solve called before a successful factorisation".to_string(),
            ));
        }
        let size = self.skyline.len();
        if b.len() != size {
            return Err(SolverError::InvalidInput(format!(
                "right-hand side has {} entries for {size} equations",
                b.len()
            )));
        }
        let mut x = b.clone();

        // L y = b
        for i in 0..size {
            let start = self.start(i);
            let mut sum = 0.0;
            for j in start..i {
                sum += self.get(i, j) * x[j];
            }
            x[i] = (x[i] - sum) / self.get(i, i);
        }

        // L^T x = y
        for i in (0..size).rev() {
            x[i] /= self.get(i, i);
            for j in self.start(i)..i {
                x[j] -= self.get(i, j) * x[i];
            }
        }

        Ok(x)
    }
}
