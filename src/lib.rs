//! Fibre Solver - nonlinear analysis of plane frames with fibre sections
//!
//! This library provides a load-controlled Newton-Raphson solver for
//! two-dimensional beam structures, supporting:
//! - Elastic-plastic uniaxial materials with isotropic hardening
//! - Fibre cross-sections (I-sections, rectangles) integrated per fibre
//! - Linear elastic and materially nonlinear Euler-Bernoulli beams
//! - Line and portal-frame mesh generators
//! - Local or partitioned (parallel) global assembly
//! - Dense LU or skyline Cholesky linear solvers
//!
//! ## Example
//! ```rust
//! use fibre_solver::prelude::*;
//!
//! let template = ElementTemplate::LinearElastic(BasicSection::new(2.06e11, 0.0125, 4.57e-4));
//! let mesh = GlobalMesh::create_line_mesh(10, [[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]], &template).unwrap();
//!
//! let mut model = Model::new(mesh);
//! model.add_restraint(NodalRestraint::fixed().with_nodes([1])).unwrap();
//! model.restrain_out_of_plane(2..=11).unwrap();
//! model.add_nodal_load(&[11], &[2], &[-1e3]).unwrap();
//!
//! let options = AnalysisOptions::new().with_steps(1).with_tolerance(1e-2);
//! let outcome = model.analyze(&options).unwrap();
//! assert!(outcome.succeeded);
//! let tip = model.node_displacement(11).unwrap();
//! assert!(tip.dz < 0.0);
//! ```

pub mod analysis;
pub mod assembly;
pub mod elements;
pub mod error;
pub mod loads;
pub mod materials;
pub mod math;
pub mod mesh;
pub mod model;
pub mod results;
pub mod sections;
pub mod solution;
pub mod solver;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::AnalysisOptions;
    pub use crate::assembly::{Assembler, BackendKind, DistributedAssembler, LocalAssembler};
    pub use crate::elements::{Element, ElementTemplate, NodalRestraint, Node, NDOF};
    pub use crate::error::{SolverError, SolverResult};
    pub use crate::loads::{LoadManager, NodalLoad};
    pub use crate::materials::{ElasticPlasticMaterial, Material1D};
    pub use crate::mesh::{FrameMesh, GlobalMesh};
    pub use crate::model::Model;
    pub use crate::results::{NodeDisplacement, Record, Scribe};
    pub use crate::sections::{BasicSection, FibreSection, SectionSummary};
    pub use crate::solution::{AnalysisOutcome, SolutionProcedure, StepReport};
    pub use crate::solver::{LinearSolverKind, Solver};
}
