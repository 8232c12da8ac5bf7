//! Dense LU backend

use nalgebra::linalg::LU;
use nalgebra::Dyn;
use nalgebra_sparse::convert::serial::convert_csr_dense;
use nalgebra_sparse::CsrMatrix;

use super::LinearSolver;
use crate::error::{SolverError, SolverResult};
use crate::math::DVec;

/// Pivots smaller than this fraction of the largest pivot are treated as zero
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Converts the stiffness to a dense matrix and factorises it with partial
/// pivoting. Suitable for the small systems of beam models.
#[derive(Debug, Default)]
pub struct LuSolver {
    lu: Option<LU<f64, Dyn, Dyn>>,
}

impl LuSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinearSolver for LuSolver {
    fn name(&self) -> &str {
        "dense-LU"
    }

    fn factorize(&mut self, k: &CsrMatrix<f64>) -> SolverResult<()> {
        if k.nrows() != k.ncols() {
            return Err(SolverError::Assembly(format!(
                "stiffness matrix is {}x{}, expected a square matrix",
                k.nrows(),
                k.ncols()
            )));
        }
        let lu = convert_csr_dense(k).lu();
        let pivots = lu.u().diagonal();
        let largest = pivots.amax();
        if !lu.is_invertible() || pivots.iter().any(|p| p.abs() <= PIVOT_TOLERANCE * largest) {
            self.lu = None;
            return Err(SolverError::SingularMatrix);
        }
        self.lu = Some(lu);
        Ok(())
    }

    fn solve(&self, b: &DVec) -> SolverResult<DVec> {
        let lu = self.lu.as_ref().ok_or_else(|| {
            SolverError::InvalidInput("solve called before a successful factorisation".to_string())
        })?;
        let x = lu.solve(b).ok_or(SolverError::SingularMatrix)?;
        if x.iter().all(|v| v.is_finite()) {
            Ok(x)
        } else {
            Err(SolverError::SingularMatrix)
        }
    }
}
