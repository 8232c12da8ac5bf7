//! Nodal restraints - sets of DoFs fixed on sets of nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{valid_dof, NDOF};
use crate::error::{SolverError, SolverResult};
use crate::mesh::GlobalMesh;

/// Restraint conditions shared by a set of similarly supported nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodalRestraint {
    restrained_dofs: BTreeSet<usize>,
    restrained_nodes: BTreeSet<usize>,
}

impl NodalRestraint {
    /// Create a restraint with no DoFs and no nodes
    pub fn new() -> Self {
        Self::default()
    }

    /// All six DoFs restrained
    pub fn fixed() -> Self {
        Self {
            restrained_dofs: (0..NDOF).collect(),
            ..Default::default()
        }
    }

    /// Translations restrained, rotations free
    pub fn pinned() -> Self {
        Self {
            restrained_dofs: [0, 1, 2].into_iter().collect(),
            ..Default::default()
        }
    }

    /// DoFs that do not take part in an x-y plane analysis
    pub fn out_of_plane() -> Self {
        Self {
            restrained_dofs: [1, 3, 4].into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn assign_dofs_restraints(
        &mut self,
        dofs: impl IntoIterator<Item = usize>,
    ) -> SolverResult<()> {
        let dofs: Vec<usize> = dofs.into_iter().collect();
        if let Some(&dof) = dofs.iter().find(|&&dof| !valid_dof(dof)) {
            return Err(SolverError::InvalidDof(dof));
        }
        self.restrained_dofs.extend(dofs);
        Ok(())
    }

    /// Restrain the nodes with the given ids
    pub fn assign_nodes_by_id(&mut self, ids: impl IntoIterator<Item = usize>) {
        self.restrained_nodes.extend(ids);
    }

    pub fn with_nodes(mut self, ids: impl IntoIterator<Item = usize>) -> Self {
        self.assign_nodes_by_id(ids);
        self
    }

    /// Fix the restrained DoFs on every restrained node of `mesh`
    pub fn apply_restraints(&self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        for &id in &self.restrained_nodes {
            mesh.node_by_id_mut(id)?.fix_dofs(&self.restrained_dofs)?;
        }
        Ok(())
    }

    /// Undo [`apply_restraints`](Self::apply_restraints)
    pub fn free_restraints(&self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        for &id in &self.restrained_nodes {
            mesh.node_by_id_mut(id)?.free_dofs(&self.restrained_dofs)?;
        }
        Ok(())
    }

    pub fn clear_restrained_nodes(&mut self) {
        self.restrained_nodes.clear();
    }

    pub fn restrained_dofs(&self) -> &BTreeSet<usize> {
        &self.restrained_dofs
    }

    pub fn restrained_nodes(&self) -> &BTreeSet<usize> {
        &self.restrained_nodes
    }
}
