//! Global assembly of the stiffness matrix and the load, resistance and
//! out-of-balance vectors
//!
//! Two backends sit behind the [`Assembler`] trait. [`LocalAssembler`] holds
//! every global quantity in one place. [`DistributedAssembler`] splits rows
//! and elements into partitions that exchange contributions and interface
//! displacements explicitly, running each partition's share in parallel.

mod distributed;
mod import;
mod local;

pub use distributed::{DistributedAssembler, Partition};
pub use import::{CombineMode, ImportPlan, InterfaceMap};
pub use local::LocalAssembler;

use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::error::SolverResult;
use crate::math::{kahan_norm_squared, DVec};
use crate::mesh::GlobalMesh;

/// Global numerical state and the operations of one Newton-Raphson iteration.
///
/// The sparsity pattern of `K` is fixed when the assembler is built from a
/// mesh with its restraints in place; later calls only refresh values.
pub trait Assembler: Send {
    fn name(&self) -> &str;

    /// Number of global equations
    fn ndofs(&self) -> usize;

    /// Clear `P` and rebuild it from the nodal load triplets
    fn assemble_global_p(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()>;

    /// Zero `K` and `R` and rebuild them from the element contributions
    fn assemble_global_k_r(&mut self, mesh: &GlobalMesh) -> SolverResult<()>;

    /// Push `U` onto the nodal displacements
    fn map_u_to_nodes(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()>;

    fn update_element_states(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()>;

    /// `G = R - P`
    fn calculate_out_of_balance(&mut self);

    /// `U += dU`
    fn increment_u(&mut self);

    /// Update `G_max = sqrt(|G|)` and compare it with `tolerance`
    fn check_convergence(&mut self, tolerance: f64) -> bool;

    /// Convergence measure from the last [`check_convergence`](Self::check_convergence)
    fn g_max(&self) -> f64;

    /// Global tangent stiffness
    fn stiffness(&self) -> SolverResult<Cow<'_, CsrMatrix<f64>>>;

    fn p(&self) -> Cow<'_, DVec>;
    fn r(&self) -> Cow<'_, DVec>;
    fn g(&self) -> Cow<'_, DVec>;
    fn u(&self) -> Cow<'_, DVec>;
    fn delta_u(&self) -> Cow<'_, DVec>;

    fn set_u(&mut self, u: &DVec) -> SolverResult<()>;
    fn set_delta_u(&mut self, delta_u: &DVec) -> SolverResult<()>;
}

/// Which [`Assembler`] backend to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    Local,
    Distributed { partitions: usize },
}

impl BackendKind {
    /// Build the backend for `mesh`, numbering its DoFs
    pub fn build(self, mesh: &mut GlobalMesh) -> SolverResult<Box<dyn Assembler>> {
        Ok(match self {
            Self::Local => Box::new(LocalAssembler::new(mesh)?),
            Self::Distributed { partitions } => {
                Box::new(DistributedAssembler::new(mesh, partitions)?)
            }
        })
    }
}

/// `sqrt(|G|_2)` with the sum of squares accumulated by compensated summation
pub(crate) fn out_of_balance_measure(norm_squared: f64) -> f64 {
    norm_squared.sqrt().sqrt()
}

pub(crate) fn g_max_of(g: &[f64]) -> f64 {
    out_of_balance_measure(kahan_norm_squared(g))
}
