//! Global mesh - the nodes and elements of a model
//!
//! Nodes are stored in id order and elements refer to them by index. The
//! mesh also owns the global DoF numbering: once restraints are applied,
//! [`GlobalMesh::number_dofs`] hands out contiguous equation numbers to the
//! active DoFs of each node.

mod frame;

pub use frame::FrameMesh;

use log::{debug, warn};
use std::collections::HashMap;

use crate::elements::{Element, ElementTemplate, Node, NDOF};
use crate::error::{SolverError, SolverResult};
use crate::math::DVec;

#[derive(Debug, Default)]
pub struct GlobalMesh {
    nodes: Vec<Node>,
    elements: Vec<Box<dyn Element>>,
    node_index: HashMap<usize, usize>,
    ndofs: usize,
}

impl GlobalMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Straight line of `divisions` equal elements from `ends[0]` to `ends[1]`.
    ///
    /// Nodes are numbered 1..=divisions+1 from the start and elements
    /// 1..=divisions.
    pub fn create_line_mesh(
        divisions: usize,
        ends: [[f64; 3]; 2],
        template: &ElementTemplate,
    ) -> SolverResult<Self> {
        if divisions == 0 {
            return Err(SolverError::InvalidMesh(
                "a line mesh needs at least one division".to_string(),
            ));
        }
        let [start, end] = ends;
        let mut mesh = Self::new();
        for i in 0..=divisions {
            let t = i as f64 / divisions as f64;
            mesh.add_node(Node::new(
                i + 1,
                start[0] + t * (end[0] - start[0]),
                start[1] + t * (end[1] - start[1]),
                start[2] + t * (end[2] - start[2]),
            ))?;
        }
        for i in 1..=divisions {
            mesh.add_element(i, [i, i + 1], template)?;
        }
        debug!(
            "Created line mesh with {} nodes and {} elements",
            mesh.nodes.len(),
            mesh.elements.len()
        );
        Ok(mesh)
    }

    /// Plane frame with `column_template` elements along the column lines and
    /// `beam_template` elements along the floors
    pub fn create_frame_mesh(
        frame: &FrameMesh,
        column_template: &ElementTemplate,
        beam_template: &ElementTemplate,
    ) -> SolverResult<Self> {
        let mut mesh = Self::new();
        for (id, [x, y, z]) in frame.node_coords()? {
            mesh.add_node(Node::new(id, x, y, z))?;
        }
        for (id, [i, j]) in frame.element_connectivity()? {
            let vertical = {
                let (a, b) = (mesh.node_by_id(i)?, mesh.node_by_id(j)?);
                (b.x - a.x).abs() < (b.y - a.y).abs()
            };
            let template = if vertical { column_template } else { beam_template };
            mesh.add_element(id, [i, j], template)?;
        }
        debug!(
            "Created {}x{} frame mesh with {} nodes and {} elements",
            frame.nbays(),
            frame.nfloors(),
            mesh.nodes.len(),
            mesh.elements.len()
        );
        Ok(mesh)
    }

    /// Add a node, keeping the node list sorted by id
    pub fn add_node(&mut self, node: Node) -> SolverResult<()> {
        if self.node_index.contains_key(&node.id) {
            return Err(SolverError::InvalidMesh(format!("duplicate node id {}", node.id)));
        }
        if !self.elements.is_empty() {
            return Err(SolverError::InvalidMesh(
                "nodes must be added before elements".to_string(),
            ));
        }
        let position = self.nodes.partition_point(|n| n.id < node.id);
        self.nodes.insert(position, node);
        self.reindex();
        Ok(())
    }

    fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id, index))
            .collect();
    }

    /// Add an element of kind `template` between two existing node ids
    pub fn add_element(
        &mut self,
        id: usize,
        node_ids: [usize; 2],
        template: &ElementTemplate,
    ) -> SolverResult<()> {
        let indices = [self.node_index_of(node_ids[0])?, self.node_index_of(node_ids[1])?];
        let element = template.build(id, indices, &self.nodes)?;
        for index in indices {
            self.nodes[index].add_connected_element(id);
        }
        self.elements.push(element);
        Ok(())
    }

    /// Position of node `id` in [`nodes`](Self::nodes)
    pub fn node_index_of(&self, id: usize) -> SolverResult<usize> {
        self.node_index
            .get(&id)
            .copied()
            .ok_or(SolverError::NodeNotFound(id))
    }

    pub fn node_by_id(&self, id: usize) -> SolverResult<&Node> {
        let index = self.node_index_of(id)?;
        Ok(&self.nodes[index])
    }

    pub fn node_by_id_mut(&mut self, id: usize) -> SolverResult<&mut Node> {
        let index = self.node_index_of(id)?;
        Ok(&mut self.nodes[index])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Box<dyn Element>] {
        &self.elements
    }

    /// Element with the given id, if any
    pub fn element_by_id(&self, id: usize) -> Option<&dyn Element> {
        self.elements.iter().find(|e| e.id() == id).map(|e| e.as_ref())
    }

    /// Borrow the nodes and the elements at the same time
    pub fn split_mut(&mut self) -> (&mut [Node], &mut [Box<dyn Element>]) {
        (&mut self.nodes, &mut self.elements)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Number of active DoFs, valid after [`number_dofs`](Self::number_dofs)
    pub fn ndofs(&self) -> usize {
        self.ndofs
    }

    /// Number the active DoFs node by node in id order
    pub fn number_dofs(&mut self) {
        let order: Vec<usize> = (0..self.nodes.len()).collect();
        self.assign_dof_numbers(&order);
    }

    /// Number the active DoFs visiting nodes in `order`, a permutation of
    /// node indices
    pub fn number_dofs_in_order(&mut self, order: &[usize]) -> SolverResult<()> {
        let mut seen = vec![false; self.nodes.len()];
        for &index in order {
            match seen.get_mut(index) {
                Some(flag) if !*flag => *flag = true,
                _ => {
                    return Err(SolverError::InvalidMesh(format!(
                        "node index {index} is repeated or out of range in the DoF order"
                    )))
                }
            }
        }
        if seen.iter().any(|&flag| !flag) {
            return Err(SolverError::InvalidMesh(
                "DoF order does not visit every node".to_string(),
            ));
        }
        self.assign_dof_numbers(order);
        Ok(())
    }

    fn assign_dof_numbers(&mut self, order: &[usize]) {
        let mut nz_i = 0;
        for &index in order {
            let node = &mut self.nodes[index];
            node.set_nz_i(nz_i);
            nz_i += node.num_active_dofs();
        }
        self.ndofs = nz_i;
        debug!("Numbered {} active DoFs over {} nodes", self.ndofs, self.nodes.len());
    }

    /// Refresh every element's map from its DoFs to global equation numbers
    pub fn map_element_stiffnesses(&mut self) {
        let (nodes, elements) = (&self.nodes, &mut self.elements);
        for element in elements.iter_mut() {
            element.map_stiffness(nodes);
        }
    }

    /// Rebuild the load triplets of every node
    pub fn calc_nodal_contributions_to_p(&mut self) {
        for node in &mut self.nodes {
            node.calc_load_triplets();
        }
    }

    /// Warn about loads on restrained DoFs; returns how many there are
    pub fn check_nodal_loads(&self) -> usize {
        let ignored: usize = self.nodes.iter().map(Node::check_loads).sum();
        if ignored > 0 {
            warn!("{ignored} nodal load(s) sit on restrained DoFs and are ignored");
        }
        ignored
    }

    /// Copy the global displacement vector `u` onto the nodes.
    ///
    /// Restrained DoFs get zero displacement.
    pub fn map_u_to_nodes(&mut self, u: &DVec) -> SolverResult<()> {
        if u.len() != self.ndofs {
            return Err(SolverError::Assembly(format!(
                "displacement vector has {} entries for {} DoFs",
                u.len(),
                self.ndofs
            )));
        }
        for node in &mut self.nodes {
            write_displacements(node, |row| Some(u[row]))?;
        }
        Ok(())
    }

    /// Update every element from the current nodal displacements
    pub fn update_element_states(&mut self) {
        let (nodes, elements) = (&self.nodes, &mut self.elements);
        for element in elements.iter_mut() {
            element.update_state(nodes);
        }
    }

    /// Commit the converged state of every element
    pub fn update_starting_states(&mut self) {
        for element in &mut self.elements {
            element.update_starting_state();
        }
    }
}

/// Set every DoF of `node` from `lookup`, which maps a global equation
/// number to its displacement. Restrained DoFs are zeroed.
pub(crate) fn write_displacements(
    node: &mut Node,
    lookup: impl Fn(usize) -> Option<f64>,
) -> SolverResult<()> {
    for dof in 0..NDOF {
        let value = match node.global_dof(dof) {
            Some(row) => lookup(row).ok_or_else(|| {
                SolverError::Assembly(format!(
                    "no displacement available for equation {row} of node {}",
                    node.id
                ))
            })?,
            None => 0.0,
        };
        node.set_nodal_displacement(dof, value)?;
    }
    Ok(())
}
