//! Result histories recorded after every converged load step

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::elements::{valid_dof, Node, NDOF};
use crate::error::{SolverError, SolverResult};
use crate::mesh::GlobalMesh;
use crate::sections::SectionSummary;

/// Displacement results at a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplacement {
    /// Displacement in X direction
    pub dx: f64,
    /// Displacement in Y direction
    pub dy: f64,
    /// Displacement in Z direction
    pub dz: f64,
    /// Rotation about X axis
    pub rx: f64,
    /// Rotation about Y axis
    pub ry: f64,
    /// Rotation about Z axis
    pub rz: f64,
}

impl NodeDisplacement {
    /// Create from array [DX, DY, DZ, RX, RY, RZ]
    pub fn from_array(arr: [f64; NDOF]) -> Self {
        Self {
            dx: arr[0],
            dy: arr[1],
            dz: arr[2],
            rx: arr[3],
            ry: arr[4],
            rz: arr[5],
        }
    }

    pub fn of_node(node: &Node) -> Self {
        Self::from_array(node.nodal_displacements())
    }

    /// Get translation magnitude
    pub fn translation_magnitude(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }

    /// Get rotation magnitude
    pub fn rotation_magnitude(&self) -> f64 {
        (self.rx.powi(2) + self.ry.powi(2) + self.rz.powi(2)).sqrt()
    }
}

/// Displacement history of selected DoFs of one node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    node_id: usize,
    tracked_dofs: BTreeSet<usize>,
    recorded_data: BTreeMap<usize, Vec<f64>>,
}

impl Record {
    pub fn new(node_id: usize, dofs: &BTreeSet<usize>) -> SolverResult<Self> {
        if let Some(&dof) = dofs.iter().find(|&&dof| !valid_dof(dof)) {
            return Err(SolverError::InvalidDof(dof));
        }
        Ok(Self {
            node_id,
            tracked_dofs: dofs.clone(),
            recorded_data: dofs.iter().map(|&dof| (dof, Vec::new())).collect(),
        })
    }

    /// Append the current displacement of every tracked DoF
    pub fn write_to_record(&mut self, node: &Node) {
        let displacements = node.nodal_displacements();
        for (&dof, history) in self.recorded_data.iter_mut() {
            history.push(displacements[dof]);
        }
    }

    pub fn node_id(&self) -> usize {
        self.node_id
    }

    pub fn tracked_dofs(&self) -> &BTreeSet<usize> {
        &self.tracked_dofs
    }

    /// History of `dof`, one entry per write
    pub fn history(&self, dof: usize) -> Option<&[f64]> {
        self.recorded_data.get(&dof).map(Vec::as_slice)
    }

    /// Most recent value of `dof`
    pub fn latest(&self, dof: usize) -> Option<f64> {
        self.history(dof).and_then(|h| h.last().copied())
    }

    pub fn len(&self) -> usize {
        self.recorded_data.values().next().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log the full history of every tracked DoF
    pub fn read_record(&self) {
        for (dof, history) in &self.recorded_data {
            info!("Node {} DoF {}: {:?}", self.node_id, dof, history);
        }
    }
}

/// Section states of one element, one entry per write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementHistory {
    pub element_id: usize,
    pub sections: Vec<Vec<SectionSummary>>,
}

/// Keeps the records of a model and appends to them at every converged step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scribe {
    records: Vec<Record>,
    element_histories: Vec<ElementHistory>,
    load_factors: Vec<f64>,
}

impl Scribe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `dofs` on every node in `node_ids`, which must exist in `mesh`
    pub fn track_nodes_by_id(
        &mut self,
        node_ids: &[usize],
        dofs: &BTreeSet<usize>,
        mesh: &GlobalMesh,
    ) -> SolverResult<()> {
        let mut new_records = Vec::with_capacity(node_ids.len());
        for &id in node_ids {
            mesh.node_by_id(id)?;
            new_records.push(Record::new(id, dofs)?);
        }
        self.records.extend(new_records);
        self.records.sort_by_key(Record::node_id);
        Ok(())
    }

    /// Record the section states of the given elements at every write
    pub fn track_elements_by_id(
        &mut self,
        element_ids: &[usize],
        mesh: &GlobalMesh,
    ) -> SolverResult<()> {
        for &id in element_ids {
            if mesh.element_by_id(id).is_none() {
                return Err(SolverError::InvalidMesh(format!("element {id} not found in mesh")));
            }
        }
        self.element_histories.extend(element_ids.iter().map(|&element_id| ElementHistory {
            element_id,
            sections: Vec::new(),
        }));
        Ok(())
    }

    pub fn write_to_records(&mut self, mesh: &GlobalMesh, load_factor: f64) -> SolverResult<()> {
        for record in &mut self.records {
            record.write_to_record(mesh.node_by_id(record.node_id)?);
        }
        for history in &mut self.element_histories {
            let id = history.element_id;
            let element = mesh
                .element_by_id(id)
                .ok_or_else(|| SolverError::InvalidMesh(format!("element {id} not found in mesh")))?;
            history.sections.push(element.section_summaries());
        }
        self.load_factors.push(load_factor);
        Ok(())
    }

    pub fn record(&self, node_id: usize) -> Option<&Record> {
        self.records
            .binary_search_by_key(&node_id, Record::node_id)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn element_history(&self, element_id: usize) -> Option<&ElementHistory> {
        self.element_histories.iter().find(|h| h.element_id == element_id)
    }

    pub fn load_factors(&self) -> &[f64] {
        &self.load_factors
    }

    /// Log every node record and the latest section states of every tracked
    /// element; returns how many records were logged
    pub fn read_all_records(&self) -> usize {
        info!("Load factors: {:?}", self.load_factors);
        for record in &self.records {
            record.read_record();
        }
        for history in &self.element_histories {
            if let Some(latest) = history.sections.last() {
                for (point, section) in latest.iter().enumerate() {
                    info!(
                        "Element {} section {}: N = {:e}, M = {:e}, eps = {:e}, kappa = {:e}",
                        history.element_id,
                        point,
                        section.axial_force,
                        section.moment,
                        section.axial_strain,
                        section.curvature
                    );
                }
            }
        }
        self.records.len() + self.element_histories.len()
    }

    /// Drop the recorded values but keep what is tracked
    pub fn clear_history(&mut self) {
        for record in &mut self.records {
            for history in record.recorded_data.values_mut() {
                history.clear();
            }
        }
        for history in &mut self.element_histories {
            history.sections.clear();
        }
        self.load_factors.clear();
    }

    pub fn to_json(&self) -> SolverResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> SolverResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
