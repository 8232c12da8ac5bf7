//! Node - a point in space carrying six degrees of freedom
//!
//! DoFs are numbered `0..6`: translations along x, y, z followed by rotations
//! about x, y, z. In-plane beam analyses use DoFs 0, 2 and 5 and restrain
//! 1, 3 and 4.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{SolverError, SolverResult};

/// Number of DoFs carried by every node
pub const NDOF: usize = 6;

/// Whether `dof` names one of the six nodal freedoms
pub fn valid_dof(dof: usize) -> bool {
    dof < NDOF
}

fn check_dof(dof: usize) -> SolverResult<()> {
    if valid_dof(dof) {
        Ok(())
    } else {
        Err(SolverError::InvalidDof(dof))
    }
}

fn checked_dofs<'a>(dofs: impl IntoIterator<Item = &'a usize>) -> SolverResult<Vec<usize>> {
    let dofs: Vec<usize> = dofs.into_iter().copied().collect();
    for &dof in &dofs {
        check_dof(dof)?;
    }
    Ok(dofs)
}

/// A node in the finite element mesh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Mesh-wide identifier, starting from 1
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,

    active_dofs: BTreeSet<usize>,
    inactive_dofs: BTreeSet<usize>,

    /// Global index of the first active DoF
    #[serde(skip)]
    nz_i: usize,
    #[serde(skip)]
    dofs_numbers: Vec<usize>,

    nodal_loads: [f64; NDOF],
    loaded_dofs: BTreeSet<usize>,
    #[serde(skip)]
    load_triplets: Vec<(usize, f64)>,

    /// Displacements [DX, DY, DZ, RX, RY, RZ]
    #[serde(skip)]
    nodal_displacements: [f64; NDOF],

    #[serde(skip)]
    connected_elements: Vec<usize>,
}

impl Node {
    /// Create a free node at the given coordinates
    pub fn new(id: usize, x: f64, y: f64, z: f64) -> Self {
        Self {
            id,
            x,
            y,
            z,
            active_dofs: (0..NDOF).collect(),
            inactive_dofs: BTreeSet::new(),
            nz_i: 0,
            dofs_numbers: Vec::new(),
            nodal_loads: [0.0; NDOF],
            loaded_dofs: BTreeSet::new(),
            load_triplets: Vec::new(),
            nodal_displacements: [0.0; NDOF],
            connected_elements: Vec::new(),
        }
    }

    /// Get the coordinates as an array
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn fix_dof(&mut self, dof: usize) -> SolverResult<()> {
        check_dof(dof)?;
        self.active_dofs.remove(&dof);
        self.inactive_dofs.insert(dof);
        Ok(())
    }

    /// Fix every DoF in `dofs`; nothing changes if any of them is invalid
    pub fn fix_dofs<'a>(&mut self, dofs: impl IntoIterator<Item = &'a usize>) -> SolverResult<()> {
        let dofs = checked_dofs(dofs)?;
        for dof in dofs {
            self.fix_dof(dof)?;
        }
        Ok(())
    }

    pub fn fix_all_dofs(&mut self) {
        self.inactive_dofs.extend(0..NDOF);
        self.active_dofs.clear();
    }

    pub fn free_dof(&mut self, dof: usize) -> SolverResult<()> {
        check_dof(dof)?;
        self.inactive_dofs.remove(&dof);
        self.active_dofs.insert(dof);
        Ok(())
    }

    pub fn free_dofs<'a>(&mut self, dofs: impl IntoIterator<Item = &'a usize>) -> SolverResult<()> {
        let dofs = checked_dofs(dofs)?;
        for dof in dofs {
            self.free_dof(dof)?;
        }
        Ok(())
    }

    pub fn is_active(&self, dof: usize) -> bool {
        self.active_dofs.contains(&dof)
    }

    pub fn active_dofs(&self) -> &BTreeSet<usize> {
        &self.active_dofs
    }

    pub fn inactive_dofs(&self) -> &BTreeSet<usize> {
        &self.inactive_dofs
    }

    pub fn num_active_dofs(&self) -> usize {
        self.active_dofs.len()
    }

    /// Set the global offset and renumber the active DoFs from it
    pub fn set_nz_i(&mut self, nz_i: usize) {
        self.nz_i = nz_i;
        self.dofs_numbers = (0..self.active_dofs.len()).map(|i| nz_i + i).collect();
    }

    pub fn nz_i(&self) -> usize {
        self.nz_i
    }

    /// Global equation numbers of the active DoFs, in DoF order
    pub fn dofs_numbers(&self) -> &[usize] {
        &self.dofs_numbers
    }

    /// Global equation number of `dof`, or `None` if it is restrained
    pub fn global_dof(&self, dof: usize) -> Option<usize> {
        self.active_dofs
            .iter()
            .position(|&d| d == dof)
            .map(|i| self.nz_i + i)
    }

    /// Set the load on `dof` and mark it as loaded
    pub fn add_nodal_load(&mut self, dof: usize, load: f64) -> SolverResult<()> {
        check_dof(dof)?;
        self.nodal_loads[dof] = load;
        self.loaded_dofs.insert(dof);
        Ok(())
    }

    /// Add to the load on an already loaded `dof`
    pub fn increment_nodal_load(&mut self, dof: usize, increment: f64) -> SolverResult<()> {
        check_dof(dof)?;
        if !self.loaded_dofs.contains(&dof) {
            return Err(SolverError::UnloadedDof { node: self.id, dof });
        }
        self.nodal_loads[dof] += increment;
        Ok(())
    }

    pub fn clear_nodal_loads(&mut self) {
        self.nodal_loads = [0.0; NDOF];
        self.loaded_dofs.clear();
        self.load_triplets.clear();
    }

    /// Loads [FX, FY, FZ, MX, MY, MZ]
    pub fn loads(&self) -> [f64; NDOF] {
        self.nodal_loads
    }

    pub fn loaded_dofs(&self) -> &BTreeSet<usize> {
        &self.loaded_dofs
    }

    /// Warn about loads on restrained DoFs; returns how many there are.
    ///
    /// Such loads stay in the bookkeeping but never reach the load vector.
    pub fn check_loads(&self) -> usize {
        let mut ignored = 0;
        for dof in self.loaded_dofs.intersection(&self.inactive_dofs) {
            warn!(
                "Node {} is loaded on restrained DoF {}; the load will not be assembled",
                self.id, dof
            );
            ignored += 1;
        }
        ignored
    }

    /// Rebuild the `(global row, load)` pairs for every active, loaded DoF
    pub fn calc_load_triplets(&mut self) {
        self.load_triplets.clear();
        for (dof_index, &dof) in self.active_dofs.iter().enumerate() {
            if self.loaded_dofs.contains(&dof) {
                self.load_triplets
                    .push((self.nz_i + dof_index, self.nodal_loads[dof]));
            }
        }
    }

    pub fn load_triplets(&self) -> &[(usize, f64)] {
        &self.load_triplets
    }

    pub fn set_nodal_displacement(&mut self, dof: usize, value: f64) -> SolverResult<()> {
        check_dof(dof)?;
        self.nodal_displacements[dof] = value;
        Ok(())
    }

    /// Displacements [DX, DY, DZ, RX, RY, RZ]
    pub fn nodal_displacements(&self) -> [f64; NDOF] {
        self.nodal_displacements
    }

    pub fn clear_nodal_displacements(&mut self) {
        self.nodal_displacements = [0.0; NDOF];
    }

    pub(crate) fn add_connected_element(&mut self, element_id: usize) {
        self.connected_elements.push(element_id);
    }

    pub fn connected_elements(&self) -> &[usize] {
        &self.connected_elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = Node::new(1, 1.0, 2.0, 3.0);
        assert_eq!(node.coords(), [1.0, 2.0, 3.0]);
        assert_eq!(node.num_active_dofs(), 6);
        assert!(node.inactive_dofs().is_empty());
    }

    #[test]
    fn test_fix_and_free_dofs() {
        let mut node = Node::new(1, 0.0, 0.0, 0.0);
        node.fix_dofs(&[1, 3, 4]).unwrap();
        assert_eq!(node.active_dofs().iter().copied().collect::<Vec<_>>(), vec![0, 2, 5]);
        assert_eq!(node.inactive_dofs().len(), 3);

        node.free_dof(3).unwrap();
        assert!(node.is_active(3));
        assert!(matches!(node.fix_dof(6), Err(SolverError::InvalidDof(6))));
    }

    #[test]
    fn test_dof_numbering_skips_restrained_dofs() {
        let mut node = Node::new(1, 0.0, 0.0, 0.0);
        node.fix_dofs(&[1, 3, 4]).unwrap();
        node.set_nz_i(9);
        assert_eq!(node.dofs_numbers(), &[9, 10, 11]);
        assert_eq!(node.global_dof(2), Some(10));
        assert_eq!(node.global_dof(5), Some(11));
        assert_eq!(node.global_dof(1), None);
    }

    #[test]
    fn test_increment_requires_loaded_dof() {
        let mut node = Node::new(4, 0.0, 0.0, 0.0);
        assert!(matches!(
            node.increment_nodal_load(2, 1.0),
            Err(SolverError::UnloadedDof { node: 4, dof: 2 })
        ));
        node.add_nodal_load(2, 0.0).unwrap();
        node.increment_nodal_load(2, -5.0).unwrap();
        node.increment_nodal_load(2, -5.0).unwrap();
        assert_eq!(node.loads()[2], -10.0);
    }

    #[test]
    fn test_load_on_restrained_dof_is_not_assembled() {
        let mut node = Node::new(1, 0.0, 0.0, 0.0);
        node.fix_dof(1).unwrap();
        node.add_nodal_load(1, 3.0).unwrap();
        node.add_nodal_load(2, 7.0).unwrap();
        node.set_nz_i(0);
        assert_eq!(node.check_loads(), 1);

        node.calc_load_triplets();
        // DoF 2 is the second active DoF once DoF 1 is restrained.
        assert_eq!(node.load_triplets(), &[(1, 7.0)]);
        assert_eq!(node.loaded_dofs().len(), 2);
    }
}
