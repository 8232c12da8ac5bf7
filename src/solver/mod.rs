//! Linear solvers for the tangent stiffness system
//!
//! A [`LinearSolver`] factorises a CSR stiffness matrix and solves against
//! dense right-hand sides. [`Solver`] wraps one backend and moves data in
//! and out of an [`Assembler`].

mod lu;
mod skyline;

pub use lu::LuSolver;
pub use skyline::SkylineSolver;

use log::trace;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

use crate::assembly::Assembler;
use crate::error::SolverResult;
use crate::math::DVec;

/// Factorise-then-solve backend.
///
/// A failed factorisation is reported as
/// [`SolverError::SingularMatrix`](crate::error::SolverError::SingularMatrix).
pub trait LinearSolver: Send + Sync {
    fn name(&self) -> &str;

    fn factorize(&mut self, k: &CsrMatrix<f64>) -> SolverResult<()>;

    /// Solve with the last factorisation
    fn solve(&self, b: &DVec) -> SolverResult<DVec>;
}

/// Which [`LinearSolver`] backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinearSolverKind {
    /// Dense LU with partial pivoting
    #[default]
    Lu,
    /// Sparse skyline Cholesky; requires a positive definite tangent
    Skyline,
}

impl LinearSolverKind {
    pub fn build(self) -> Box<dyn LinearSolver> {
        match self {
            Self::Lu => Box::new(LuSolver::new()),
            Self::Skyline => Box::new(SkylineSolver::new()),
        }
    }
}

pub struct Solver {
    backend: Box<dyn LinearSolver>,
}

impl Solver {
    pub fn new(kind: LinearSolverKind) -> Self {
        Self::with_backend(kind.build())
    }

    pub fn with_backend(backend: Box<dyn LinearSolver>) -> Self {
        Self { backend }
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// `U = K^-1 P`
    pub fn solve_for_u(&mut self, assembler: &mut dyn Assembler) -> SolverResult<()> {
        let u = {
            let k = assembler.stiffness()?;
            self.backend.factorize(&k)?;
            self.backend.solve(&assembler.p())?
        };
        assembler.set_u(&u)
    }

    /// `dU = -K^-1 G`
    pub fn solve_for_delta_u(&mut self, assembler: &mut dyn Assembler) -> SolverResult<()> {
        let delta_u = {
            let k = assembler.stiffness()?;
            self.backend.factorize(&k)?;
            -self.backend.solve(&assembler.g())?
        };
        trace!("{} solve: |dU| = {:e}", self.backend.name(), delta_u.norm());
        assembler.set_delta_u(&delta_u)
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(LinearSolverKind::default())
    }
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver").field("backend", &self.backend.name()).finish()
    }
}
