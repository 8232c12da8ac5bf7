//! Nodal loads - a reference load pattern applied to a set of nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::elements::{valid_dof, NDOF};
use crate::error::{SolverError, SolverResult};
use crate::mesh::GlobalMesh;

/// Reference loads shared by a set of nodes.
///
/// The stored loads are the values at a load factor of one. They reach the
/// nodes only through [`increment_loads`](Self::increment_loads), scaled by
/// the load factor increment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodalLoad {
    loaded_nodes: Vec<usize>,
    loaded_dofs: BTreeSet<usize>,
    nodal_loads: [f64; NDOF],
}

impl NodalLoad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign reference loads, pairing `dofs[i]` with `loads[i]`
    pub fn assign_dofs_loads(&mut self, dofs: &[usize], loads: &[f64]) -> SolverResult<()> {
        if dofs.len() != loads.len() {
            return Err(SolverError::MismatchedLoadInput {
                dofs: dofs.len(),
                loads: loads.len(),
            });
        }
        if let Some(&dof) = dofs.iter().find(|&&dof| !valid_dof(dof)) {
            return Err(SolverError::InvalidDof(dof));
        }
        for (&dof, &load) in dofs.iter().zip(loads) {
            self.loaded_dofs.insert(dof);
            self.nodal_loads[dof] = load;
        }
        Ok(())
    }

    /// Load the nodes with the given ids; every id must exist in `mesh`
    pub fn assign_nodes_by_id(&mut self, ids: &[usize], mesh: &GlobalMesh) -> SolverResult<()> {
        for &id in ids {
            mesh.node_by_id(id)?;
        }
        self.loaded_nodes.extend_from_slice(ids);
        Ok(())
    }

    /// Put a zero load on every loaded DoF so later increments can add to it
    pub fn initialise_loads(&self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        for &id in &self.loaded_nodes {
            let node = mesh.node_by_id_mut(id)?;
            for &dof in &self.loaded_dofs {
                node.add_nodal_load(dof, 0.0)?;
            }
        }
        Ok(())
    }

    /// Add `load * load_factor_increment` on every loaded DoF of every node
    pub fn increment_loads(
        &self,
        mesh: &mut GlobalMesh,
        load_factor_increment: f64,
    ) -> SolverResult<()> {
        for &id in &self.loaded_nodes {
            let node = mesh.node_by_id_mut(id)?;
            for &dof in &self.loaded_dofs {
                node.increment_nodal_load(dof, self.nodal_loads[dof] * load_factor_increment)?;
            }
        }
        Ok(())
    }

    /// Remove every load from the loaded nodes
    pub fn unload_loaded_nodes(&self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        for &id in &self.loaded_nodes {
            mesh.node_by_id_mut(id)?.clear_nodal_loads();
        }
        Ok(())
    }

    pub fn clear_loads(&mut self) {
        self.loaded_dofs.clear();
        self.nodal_loads = [0.0; NDOF];
    }

    pub fn reset(&mut self) {
        self.clear_loads();
        self.loaded_nodes.clear();
    }

    pub fn loaded_nodes(&self) -> &[usize] {
        &self.loaded_nodes
    }

    pub fn loaded_dofs(&self) -> &BTreeSet<usize> {
        &self.loaded_dofs
    }

    /// Reference loads [FX, FY, FZ, MX, MY, MZ]
    pub fn nodal_loads(&self) -> [f64; NDOF] {
        self.nodal_loads
    }
}
