//! Load manager - owns the nodal loads and applies load factor increments

use log::debug;

use super::NodalLoad;
use crate::error::SolverResult;
use crate::mesh::GlobalMesh;

#[derive(Debug, Clone, Default)]
pub struct LoadManager {
    nodal_loads: Vec<NodalLoad>,
}

impl LoadManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a nodal load pairing `dofs[i]` with `loads[i]` on every node in
    /// `node_ids`
    pub fn create_a_nodal_load_by_id(
        &mut self,
        node_ids: &[usize],
        dofs: &[usize],
        loads: &[f64],
        mesh: &GlobalMesh,
    ) -> SolverResult<()> {
        let mut nodal_load = NodalLoad::new();
        nodal_load.assign_dofs_loads(dofs, loads)?;
        nodal_load.assign_nodes_by_id(node_ids, mesh)?;
        self.nodal_loads.push(nodal_load);
        Ok(())
    }

    pub fn add_nodal_load(&mut self, nodal_load: NodalLoad) {
        self.nodal_loads.push(nodal_load);
    }

    /// Zero the load on every loaded DoF before the first increment
    pub fn initialise_loads(&self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        for nodal_load in &self.nodal_loads {
            nodal_load.initialise_loads(mesh)?;
        }
        Ok(())
    }

    pub fn increment_loads(
        &self,
        mesh: &mut GlobalMesh,
        load_factor_increment: f64,
    ) -> SolverResult<()> {
        debug!("Incrementing nodal loads by dLF = {load_factor_increment:e}");
        for nodal_load in &self.nodal_loads {
            nodal_load.increment_loads(mesh, load_factor_increment)?;
        }
        Ok(())
    }

    /// Strip every load from the loaded nodes and forget the load definitions
    pub fn remove_loads(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        for nodal_load in &self.nodal_loads {
            nodal_load.unload_loaded_nodes(mesh)?;
        }
        self.nodal_loads.clear();
        Ok(())
    }

    pub fn nodal_loads(&self) -> &[NodalLoad] {
        &self.nodal_loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementTemplate;
    use crate::sections::BasicSection;
    use approx::assert_relative_eq;

    #[test]
    fn test_loads_accumulate_and_are_removed() {
        let template = ElementTemplate::LinearElastic(BasicSection::new(2.06e11, 0.0125, 4.57e-4));
        let mut mesh =
            GlobalMesh::create_line_mesh(4, [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]], &template).unwrap();

        let mut manager = LoadManager::new();
        manager
            .create_a_nodal_load_by_id(&[2, 4], &[2], &[-50.0], &mesh)
            .unwrap();
        manager.initialise_loads(&mut mesh).unwrap();
        manager.increment_loads(&mut mesh, 0.1).unwrap();
        manager.increment_loads(&mut mesh, 0.1).unwrap();

        assert_relative_eq!(mesh.node_by_id(2).unwrap().loads()[2], -10.0, max_relative = 1e-12);
        assert_relative_eq!(mesh.node_by_id(4).unwrap().loads()[2], -10.0, max_relative = 1e-12);
        assert_eq!(mesh.node_by_id(3).unwrap().loads()[2], 0.0);

        manager.remove_loads(&mut mesh).unwrap();
        assert!(manager.nodal_loads().is_empty());
        assert!(mesh.node_by_id(2).unwrap().loaded_dofs().is_empty());
    }

    #[test]
    fn test_increment_without_initialisation_fails() {
        let template = ElementTemplate::LinearElastic(BasicSection::new(2.06e11, 0.0125, 4.57e-4));
        let mut mesh =
            GlobalMesh::create_line_mesh(1, [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &template).unwrap();
        let mut manager = LoadManager::new();
        manager
            .create_a_nodal_load_by_id(&[2], &[0], &[1.0], &mesh)
            .unwrap();
        assert!(manager.increment_loads(&mut mesh, 1.0).is_err());
    }
}
