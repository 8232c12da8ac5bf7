//! Materially nonlinear beam with fibre sections
//!
//! Euler-Bernoulli kinematics in the x-y plane with small displacements. Two
//! Gauss points along the element each carry an independent copy of the fibre
//! section. At a point `x` from the first node
//!
//! ```text
//! eps   = delta / L
//! kappa = (-4/L + 6x/L^2) theta_1 + (-2/L + 6x/L^2) theta_2
//! ```
//!
//! and the local end forces and tangent stiffness follow by integrating
//! `B^T [N, M]` and `B^T D_t B` over the length.

use super::{BeamGeometry, Element, Node, StiffnessTriplet, VectorEntry};
use crate::error::SolverResult;
use crate::math::{Mat2x3, Mat3, Vec3};
use crate::sections::{FibreSection, SectionSummary};

/// Gauss point locations as fractions of the element length
pub const GAUSS_POINTS: [f64; 2] = [0.2113248654, 0.78867513459];
/// Gauss weights as fractions of the element length
pub const GAUSS_WEIGHTS: [f64; 2] = [0.5, 0.5];

#[derive(Debug, Clone)]
pub struct PlasticBeam2D {
    id: usize,
    geometry: BeamGeometry,
    sections: Vec<FibreSection>,
    points: [f64; 2],
    weights: [f64; 2],
    local_d: Vec3,
    local_f: Vec3,
    local_stiffness: Mat3,
}

impl PlasticBeam2D {
    pub fn new(
        id: usize,
        node_indices: [usize; 2],
        nodes: &[Node],
        section: &FibreSection,
    ) -> SolverResult<Self> {
        let geometry = BeamGeometry::new(node_indices, nodes)?;
        let length = geometry.length();

        let mut beam = Self {
            id,
            geometry,
            sections: vec![section.clone(); GAUSS_POINTS.len()],
            points: GAUSS_POINTS.map(|x| x * length),
            weights: GAUSS_WEIGHTS.map(|w| w * length),
            local_d: Vec3::zeros(),
            local_f: Vec3::zeros(),
            local_stiffness: Mat3::zeros(),
        };
        beam.update_state(nodes);
        Ok(beam)
    }

    #[rustfmt::skip]
    fn strain_displacement(&self, x: f64) -> Mat2x3 {
        let l = self.geometry.length();
        let slope = 6.0 * x / (l * l);
        Mat2x3::new(
            1.0 / l, 0.0,              0.0,
            0.0,     -4.0 / l + slope, -2.0 / l + slope,
        )
    }

    pub fn sections(&self) -> &[FibreSection] {
        &self.sections
    }

    pub fn geometry(&self) -> &BeamGeometry {
        &self.geometry
    }

    pub fn local_stiffness(&self) -> &Mat3 {
        &self.local_stiffness
    }

    pub fn local_deformations(&self) -> Vec3 {
        self.local_d
    }
}

impl Element for PlasticBeam2D {
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
        self.local_f = Vec3::zeros();
        self.local_stiffness = Mat3::zeros();

        for i in 0..self.sections.len() {
            let b = self.strain_displacement(self.points[i]);
            let eps = b * self.local_d;
            let section = &mut self.sections[i];
            section.update_section_state(eps[0], eps[1]);

            let w = self.weights[i];
            self.local_f += w * b.transpose() * section.resultants();
            self.local_stiffness += w * b.transpose() * section.tangent() * b;
        }

        self.geometry.globalise(&self.local_stiffness, &self.local_f);
    }

    fn update_starting_state(&mut self) {
        for section in &mut self.sections {
            section.update_starting_state();
        }
    }

    fn insert_stiffness_contributions(&self, buffer: &mut Vec<StiffnessTriplet>) {
        self.geometry.insert_stiffness(buffer);
    }

    fn insert_resistance_contributions(&self, buffer: &mut Vec<VectorEntry>) {
        self.geometry.insert_resistance(buffer);
    }

    fn local_forces(&self) -> Vec3 {
        self.local_f
    }

    fn section_summaries(&self) -> Vec<SectionSummary> {
        self.sections.iter().map(FibreSection::summary).collect()
    }
}
