//! Model - the mesh together with its restraints, loads and records

use log::info;
use std::collections::BTreeSet;

use crate::analysis::AnalysisOptions;
use crate::elements::NodalRestraint;
use crate::error::{SolverError, SolverResult};
use crate::loads::LoadManager;
use crate::mesh::GlobalMesh;
use crate::results::{NodeDisplacement, Scribe};
use crate::solution::{AnalysisOutcome, SolutionProcedure};
use crate::solver::Solver;

/// A structural model ready to be analysed once.
///
/// An analysis that ends in an `Err` leaves partially applied loads and
/// uncommitted section states in the mesh, so the model refuses to run again
/// and has to be rebuilt.
#[derive(Debug)]
pub struct Model {
    pub mesh: GlobalMesh,
    pub load_manager: LoadManager,
    pub scribe: Scribe,
    restraints: Vec<NodalRestraint>,
    initialised: bool,
    attempted: bool,
    outcome: Option<AnalysisOutcome>,
}

impl Model {
    pub fn new(mesh: GlobalMesh) -> Self {
        Self {
            mesh,
            load_manager: LoadManager::new(),
            scribe: Scribe::new(),
            restraints: Vec::new(),
            initialised: false,
            attempted: false,
            outcome: None,
        }
    }

    /// Add a restraint; it is applied by
    /// [`initialise_restraints_n_loads`](Self::initialise_restraints_n_loads)
    pub fn add_restraint(&mut self, restraint: NodalRestraint) -> SolverResult<()> {
        for &id in restraint.restrained_nodes() {
            self.mesh.node_by_id(id)?;
        }
        self.restraints.push(restraint);
        Ok(())
    }

    /// Restrain DoFs 1, 3 and 4 on the given nodes
    pub fn restrain_out_of_plane(
        &mut self,
        node_ids: impl IntoIterator<Item = usize>,
    ) -> SolverResult<()> {
        self.add_restraint(NodalRestraint::out_of_plane().with_nodes(node_ids))
    }

    /// Reference load pairing `dofs[i]` with `loads[i]` on each of `node_ids`
    pub fn add_nodal_load(
        &mut self,
        node_ids: &[usize],
        dofs: &[usize],
        loads: &[f64],
    ) -> SolverResult<()> {
        self.load_manager
            .create_a_nodal_load_by_id(node_ids, dofs, loads, &self.mesh)
    }

    pub fn track_nodes(&mut self, node_ids: &[usize], dofs: &[usize]) -> SolverResult<()> {
        let dofs: BTreeSet<usize> = dofs.iter().copied().collect();
        self.scribe.track_nodes_by_id(node_ids, &dofs, &self.mesh)
    }

    pub fn track_elements(&mut self, element_ids: &[usize]) -> SolverResult<()> {
        self.scribe.track_elements_by_id(element_ids, &self.mesh)
    }

    pub fn restraints(&self) -> &[NodalRestraint] {
        &self.restraints
    }

    /// Apply every restraint, zero the loaded DoFs and warn about loads on
    /// restrained DoFs. Runs once.
    pub fn initialise_restraints_n_loads(&mut self) -> SolverResult<()> {
        if self.initialised {
            return Ok(());
        }
        for restraint in &self.restraints {
            restraint.apply_restraints(&mut self.mesh)?;
        }
        self.load_manager.initialise_loads(&mut self.mesh)?;
        self.mesh.check_nodal_loads();
        self.initialised = true;
        Ok(())
    }

    /// Run a load-controlled analysis with the backends named in `options`
    pub fn analyze(&mut self, options: &AnalysisOptions) -> SolverResult<AnalysisOutcome> {
        options.validate()?;
        if let Some(outcome) = &self.outcome {
            return Err(SolverError::InvalidInput(format!(
                "model has already been analysed up to LF = {}",
                outcome.load_factor
            )));
        }
        if self.attempted {
            return Err(SolverError::InvalidInput(
                "a previous analysis of this model failed; rebuild the model".to_string(),
            ));
        }
        self.attempted = true;
        self.initialise_restraints_n_loads()?;

        let mut assembler = options.backend.build(&mut self.mesh)?;
        let mut solver = Solver::new(options.linear_solver);
        let mut procedure = SolutionProcedure::from_options(options)?;
        info!(
            "Model: {} nodes, {} elements, {} DoFs",
            self.mesh.num_nodes(),
            self.mesh.num_elements(),
            self.mesh.ndofs()
        );

        let outcome = procedure.solve(
            &mut self.mesh,
            assembler.as_mut(),
            &mut solver,
            &self.load_manager,
            &mut self.scribe,
        )?;
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_analyzed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Current displacements of node `id`
    pub fn node_displacement(&self, id: usize) -> SolverResult<NodeDisplacement> {
        Ok(NodeDisplacement::of_node(self.mesh.node_by_id(id)?))
    }
}
