//! Structural elements module

mod beam;
mod linear_beam;
mod node;
mod plastic_beam;
mod restraint;

pub use beam::BeamGeometry;
pub use linear_beam::LinearBeam2D;
pub use node::{valid_dof, Node, NDOF};
pub use plastic_beam::{PlasticBeam2D, GAUSS_POINTS, GAUSS_WEIGHTS};
pub use restraint::NodalRestraint;

use std::fmt;

use crate::error::SolverResult;
use crate::math::Vec3;
use crate::sections::{BasicSection, FibreSection, SectionSummary};

/// `(row, col, value)` contribution to the global stiffness matrix
pub type StiffnessTriplet = (usize, usize, f64);
/// `(row, value)` contribution to a global vector
pub type VectorEntry = (usize, f64);

/// Behaviour the assembler needs from an element.
///
/// Elements refer to their nodes by index into the mesh's node list and read
/// nodal displacements from there on every state update.
pub trait Element: fmt::Debug + Send + Sync {
    fn id(&self) -> usize;

    /// Indices of the element's nodes in the mesh node list
    fn node_indices(&self) -> &[usize];

    /// Cache the global equation numbers of the element's active DoFs
    fn map_stiffness(&mut self, nodes: &[Node]);

    /// Global equation numbers touched by this element
    fn global_dofs(&self) -> Vec<usize>;

    /// Recompute deformations, section states, stiffness and resistance from
    /// the current nodal displacements
    fn update_state(&mut self, nodes: &[Node]);

    /// Commit the converged state of every section
    fn update_starting_state(&mut self);

    fn insert_stiffness_contributions(&self, buffer: &mut Vec<StiffnessTriplet>);

    fn insert_resistance_contributions(&self, buffer: &mut Vec<VectorEntry>);

    /// Local end forces `[F, M1, M2]`
    fn local_forces(&self) -> Vec3;

    /// Section states at the integration points, if the element has any
    fn section_summaries(&self) -> Vec<SectionSummary> {
        Vec::new()
    }
}

/// Element recipe used by the mesh generators
#[derive(Debug, Clone)]
pub enum ElementTemplate {
    /// Small-displacement elastic beam
    LinearElastic(BasicSection),
    /// Small-displacement beam with fibre sections at two Gauss points
    FibrePlastic(FibreSection),
}

impl ElementTemplate {
    /// Build an element of this kind between `node_indices`
    pub fn build(
        &self,
        id: usize,
        node_indices: [usize; 2],
        nodes: &[Node],
    ) -> SolverResult<Box<dyn Element>> {
        Ok(match self {
            Self::LinearElastic(section) => {
                Box::new(LinearBeam2D::new(id, node_indices, nodes, *section)?)
            }
            Self::FibrePlastic(section) => {
                Box::new(PlasticBeam2D::new(id, node_indices, nodes, section)?)
            }
        })
    }
}
