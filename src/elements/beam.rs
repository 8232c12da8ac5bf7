//! Geometry and global bookkeeping shared by the two-node in-plane beams

use super::{Node, StiffnessTriplet, VectorEntry, NDOF};
use crate::error::{SolverError, SolverResult};
use crate::math::{beam_deformation_matrix, Mat12, Mat3, Mat3x12, Vec12, Vec3};

/// Base configuration of a two-node beam plus its global contributions
#[derive(Debug, Clone)]
pub struct BeamGeometry {
    node_indices: [usize; 2],
    length: f64,
    cos: f64,
    sin: f64,
    transform: Mat3x12,
    dof_map: [Option<usize>; 2 * NDOF],
    global_stiffness: Mat12,
    global_resistance: Vec12,
}

impl BeamGeometry {
    pub fn new(node_indices: [usize; 2], nodes: &[Node]) -> SolverResult<Self> {
        let [i, j] = node_indices;
        let (node_i, node_j) = match (nodes.get(i), nodes.get(j)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(SolverError::InvalidMesh(format!(
                    "beam refers to node index {} or {} outside a mesh of {} nodes",
                    i,
                    j,
                    nodes.len()
                )))
            }
        };

        let dx = node_j.x - node_i.x;
        let dy = node_j.y - node_i.y;
        let length = (dx * dx + dy * dy).sqrt();
        if length < 1e-10 {
            return Err(SolverError::InvalidMesh(format!(
                "beam between nodes {} and {} has zero in-plane length",
                node_i.id, node_j.id
            )));
        }
        let (cos, sin) = (dx / length, dy / length);

        let mut geometry = Self {
            node_indices,
            length,
            cos,
            sin,
            transform: beam_deformation_matrix(cos, sin, length),
            dof_map: [None; 2 * NDOF],
            global_stiffness: Mat12::zeros(),
            global_resistance: Vec12::zeros(),
        };
        geometry.map_dofs(nodes);
        Ok(geometry)
    }

    pub fn node_indices(&self) -> &[usize] {
        &self.node_indices
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Direction cosines `(cos, sin)` of the chord in the x-y plane
    pub fn direction(&self) -> (f64, f64) {
        (self.cos, self.sin)
    }

    pub fn transform(&self) -> &Mat3x12 {
        &self.transform
    }

    /// Look up the global equation number of every element DoF
    pub fn map_dofs(&mut self, nodes: &[Node]) {
        for (n, &index) in self.node_indices.iter().enumerate() {
            let node = &nodes[index];
            for dof in 0..NDOF {
                self.dof_map[n * NDOF + dof] = node.global_dof(dof);
            }
        }
    }

    pub fn global_dofs(&self) -> Vec<usize> {
        self.dof_map.iter().flatten().copied().collect()
    }

    /// Gather the 12 nodal displacements of the element
    pub fn element_displacements(&self, nodes: &[Node]) -> Vec12 {
        let mut u = Vec12::zeros();
        for (n, &index) in self.node_indices.iter().enumerate() {
            let disps = nodes[index].nodal_displacements();
            for dof in 0..NDOF {
                u[n * NDOF + dof] = disps[dof];
            }
        }
        u
    }

    /// Local deformations `[delta, theta_1, theta_2]`
    pub fn deformations(&self, nodes: &[Node]) -> Vec3 {
        self.transform * self.element_displacements(nodes)
    }

    /// Rotate local stiffness and end forces into the global element DoFs
    pub fn globalise(&mut self, local_stiffness: &Mat3, local_forces: &Vec3) {
        self.global_stiffness = self.transform.transpose() * local_stiffness * self.transform;
        self.global_resistance = self.transform.transpose() * local_forces;
    }

    pub fn global_stiffness(&self) -> &Mat12 {
        &self.global_stiffness
    }

    pub fn global_resistance(&self) -> &Vec12 {
        &self.global_resistance
    }

    pub fn insert_stiffness(&self, buffer: &mut Vec<StiffnessTriplet>) {
        for (a, row) in self.dof_map.iter().enumerate() {
            let Some(row) = *row else { continue };
            for (b, col) in self.dof_map.iter().enumerate() {
                if let Some(col) = *col {
                    buffer.push((row, col, self.global_stiffness[(a, b)]));
                }
            }
        }
    }

    pub fn insert_resistance(&self, buffer: &mut Vec<VectorEntry>) {
        for (a, row) in self.dof_map.iter().enumerate() {
            if let Some(row) = *row {
                buffer.push((row, self.global_resistance[a]));
            }
        }
    }
}
