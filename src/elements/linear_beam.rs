//! Linear elastic Euler-Bernoulli beam in the x-y plane

use super::{BeamGeometry, Element, Node, StiffnessTriplet, VectorEntry};
use crate::error::SolverResult;
use crate::math::{Mat3, Vec3};
use crate::sections::BasicSection;

#[derive(Debug, Clone)]
pub struct LinearBeam2D {
    id: usize,
    geometry: BeamGeometry,
    section: BasicSection,
    local_stiffness: Mat3,
    local_d: Vec3,
    local_f: Vec3,
}

impl LinearBeam2D {
    pub fn new(
        id: usize,
        node_indices: [usize; 2],
        nodes: &[Node],
        section: BasicSection,
    ) -> SolverResult<Self> {
        let geometry = BeamGeometry::new(node_indices, nodes)?;
        let l = geometry.length();
        let ea = section.ea();
        let ei = section.ei();

        #[rustfmt::skip]
        let local_stiffness = Mat3::new(
            ea / l, 0.0,             0.0,
            0.0,    4.0 * ei / l,    2.0 * ei / l,
            0.0,    2.0 * ei / l,    4.0 * ei / l,
        );

        let mut beam = Self {
            id,
            geometry,
            section,
            local_stiffness,
            local_d: Vec3::zeros(),
            local_f: Vec3::zeros(),
        };
        beam.update_state(nodes);
        Ok(beam)
    }

    pub fn section(&self) -> &BasicSection {
        &self.section
    }

    pub fn geometry(&self) -> &BeamGeometry {
        &self.geometry
    }
}

impl Element for LinearBeam2D {
    fn id(&self) -> usize {
        self.id
    }

    fn node_indices(&self) -> &[usize] {
        self.geometry.node_indices()
    }

    fn map_stiffness(&mut self, nodes: &[Node]) {
        self.geometry.map_dofs(nodes);
    }

    fn global_dofs(&self) -> Vec<usize> {
        self.geometry.global_dofs()
    }

    fn update_state(&mut self, nodes: &[Node]) {
        self.local_d = self.geometry.deformations(nodes);
        self.local_f = self.local_stiffness * self.local_d;
        self.geometry.globalise(&self.local_stiffness, &self.local_f);
    }

    fn update_starting_state(&mut self) {}

    fn insert_stiffness_contributions(&self, buffer: &mut Vec<StiffnessTriplet>) {
        self.geometry.insert_stiffness(buffer);
    }

    fn insert_resistance_contributions(&self, buffer: &mut Vec<VectorEntry>) {
        self.geometry.insert_resistance(buffer);
    }

    fn local_forces(&self) -> Vec3 {
        self.local_f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_nodes(length: f64) -> Vec<Node> {
        vec![Node::new(1, 0.0, 0.0, 0.0), Node::new(2, length, 0.0, 0.0)]
    }

    #[test]
    fn test_global_stiffness_symmetry() {
        let mut nodes = two_nodes(3.0);
        nodes[1].x = 2.0;
        nodes[1].y = 1.5;
        let beam = LinearBeam2D::new(1, [0, 1], &nodes, BasicSection::new(2.06e11, 0.0125, 4.57e-4))
            .unwrap();
        let k = beam.geometry().global_stiffness();
        for i in 0..12 {
            for j in 0..12 {
                assert_relative_eq!(k[(i, j)], k[(j, i)], epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_constant_tension() {
        let section = BasicSection::new(2.06e11, 0.0125, 4.57e-4);
        let mut nodes = two_nodes(3.0);
        nodes[0].set_nodal_displacement(0, -0.5e-3).unwrap();
        nodes[1].set_nodal_displacement(0, 0.5e-3).unwrap();
        let beam = LinearBeam2D::new(1, [0, 1], &nodes, section).unwrap();

        let f = beam.local_forces();
        assert_relative_eq!(f[0], section.ea() * 1e-3 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(f[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rigid_body_motion_is_stress_free() {
        let mut nodes = two_nodes(3.0);
        for node in &mut nodes {
            node.set_nodal_displacement(2, 1.0).unwrap();
        }
        let beam = LinearBeam2D::new(1, [0, 1], &nodes, BasicSection::new(2.06e11, 0.0125, 4.57e-4))
            .unwrap();
        assert_relative_eq!(beam.local_forces().norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stiffness_map_excludes_restrained_dofs() {
        let mut nodes = two_nodes(3.0);
        nodes[0].fix_all_dofs();
        nodes[1].fix_dofs(&[1, 3, 4]).unwrap();
        nodes[0].set_nz_i(0);
        nodes[1].set_nz_i(0);
        let beam = LinearBeam2D::new(1, [0, 1], &nodes, BasicSection::new(2.06e11, 0.0125, 4.57e-4))
            .unwrap();
        assert_eq!(beam.global_dofs(), vec![0, 1, 2]);

        let mut triplets = Vec::new();
        beam.insert_stiffness_contributions(&mut triplets);
        assert_eq!(triplets.len(), 9);
    }
}
