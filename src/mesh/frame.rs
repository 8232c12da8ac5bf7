//! Node and element numbering of a regular multi-bay, multi-storey frame
//!
//! Node ids run up each column line, then along the beams of the bay to its
//! right floor by floor, then up the next column line. Ids start from 1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{SolverError, SolverResult};

/// Geometry and subdivision of an `nbays x nfloors` plane frame in x-y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMesh {
    nbays: usize,
    nfloors: usize,
    bay_length: f64,
    floor_height: f64,
    beam_divisions: usize,
    column_divisions: usize,
}

impl FrameMesh {
    pub fn new(
        nbays: usize,
        nfloors: usize,
        bay_length: f64,
        floor_height: f64,
        beam_divisions: usize,
        column_divisions: usize,
    ) -> SolverResult<Self> {
        if nbays == 0 || nfloors == 0 || beam_divisions == 0 || column_divisions == 0 {
            return Err(SolverError::InvalidMesh(format!(
                "frame needs at least one bay, floor and division, got {nbays} bays, \
                 {nfloors} floors, {beam_divisions}/{column_divisions} divisions"
            )));
        }
        if bay_length <= 0.0 || floor_height <= 0.0 {
            return Err(SolverError::InvalidMesh(
                "bay length and floor height must be positive".to_string(),
            ));
        }
        Ok(Self {
            nbays,
            nfloors,
            bay_length,
            floor_height,
            beam_divisions,
            column_divisions,
        })
    }

    pub fn nbays(&self) -> usize {
        self.nbays
    }

    pub fn nfloors(&self) -> usize {
        self.nfloors
    }

    fn nodes_per_column_line(&self) -> usize {
        self.nfloors * self.column_divisions + 1
    }

    fn nodes_per_full_bay(&self) -> usize {
        self.nfloors * (self.beam_divisions - 1)
    }

    fn nodes_per_beam(&self) -> usize {
        self.beam_divisions - 1
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes_per_column_line() * (self.nbays + 1) + self.nodes_per_full_bay() * self.nbays
    }

    pub fn num_elements(&self) -> usize {
        (self.nodes_per_column_line() - 1) * (self.nbays + 1)
            + self.beam_divisions * self.nfloors * self.nbays
    }

    /// Id of the node where `column_line` (0..=nbays) meets `floor` (0..=nfloors)
    pub fn vertex_id(&self, column_line: usize, floor: usize) -> SolverResult<usize> {
        if column_line > self.nbays || floor > self.nfloors {
            return Err(SolverError::InvalidMesh(format!(
                "no vertex at column line {column_line}/{} and floor {floor}/{}",
                self.nbays, self.nfloors
            )));
        }
        Ok(1 + floor * self.column_divisions
            + column_line * (self.nodes_per_column_line() + self.nodes_per_full_bay()))
    }

    /// Every node of a column line from base to top, vertices included
    pub fn column_line_node_ids(&self, column_line: usize) -> SolverResult<Vec<usize>> {
        let first = self.vertex_id(column_line, 0)?;
        Ok((first..first + self.nodes_per_column_line()).collect())
    }

    /// Nodes of the beam spanning `bay` (1..=nbays) at `floor` (1..=nfloors),
    /// ordered from left to right
    pub fn beam_node_ids(
        &self,
        bay: usize,
        floor: usize,
        include_vertices: bool,
    ) -> SolverResult<Vec<usize>> {
        if bay == 0 || floor == 0 || bay > self.nbays || floor > self.nfloors {
            return Err(SolverError::InvalidMesh(format!(
                "no beam at bay {bay}/{} and floor {floor}/{}",
                self.nbays, self.nfloors
            )));
        }
        let start = bay * self.nodes_per_column_line()
            + (bay - 1) * self.nodes_per_full_bay()
            + (floor - 1) * self.nodes_per_beam();

        let mut nodes = Vec::with_capacity(self.nodes_per_beam() + 2);
        if include_vertices {
            nodes.push(self.vertex_id(bay - 1, floor)?);
        }
        nodes.extend((1..=self.nodes_per_beam()).map(|i| start + i));
        if include_vertices {
            nodes.push(self.vertex_id(bay, floor)?);
        }
        Ok(nodes)
    }

    pub fn column_bases(&self) -> BTreeSet<usize> {
        (0..=self.nbays)
            .map(|c| 1 + c * (self.nodes_per_column_line() + self.nodes_per_full_bay()))
            .collect()
    }

    /// All nodes that need restraining against out-of-plane motion, which is
    /// every node but the column bases
    pub fn out_of_plane_nodes(&self) -> BTreeSet<usize> {
        let bases = self.column_bases();
        (1..=self.num_nodes()).filter(|id| !bases.contains(id)).collect()
    }

    /// `(id, [x, y, z])` for every node, sorted by id
    pub fn node_coords(&self) -> SolverResult<Vec<(usize, [f64; 3])>> {
        let dx = self.bay_length / self.beam_divisions as f64;
        let dy = self.floor_height / self.column_divisions as f64;

        let mut coords = Vec::with_capacity(self.num_nodes());
        for column_line in 0..=self.nbays {
            let x = column_line as f64 * self.bay_length;
            for (i, id) in self.column_line_node_ids(column_line)?.into_iter().enumerate() {
                coords.push((id, [x, i as f64 * dy, 0.0]));
            }
        }
        for floor in 1..=self.nfloors {
            let y = floor as f64 * self.floor_height;
            for bay in 1..=self.nbays {
                let x0 = (bay - 1) as f64 * self.bay_length;
                for (i, id) in self.beam_node_ids(bay, floor, false)?.into_iter().enumerate() {
                    coords.push((id, [x0 + (i + 1) as f64 * dx, y, 0.0]));
                }
            }
        }
        coords.sort_by_key(|&(id, _)| id);
        Ok(coords)
    }

    /// `(element id, [node id, node id])` with element ids starting from 1.
    ///
    /// For each bay, the column line on its left comes first followed by its
    /// beams floor by floor; the last column line closes the list.
    pub fn element_connectivity(&self) -> SolverResult<Vec<(usize, [usize; 2])>> {
        let mut elements = Vec::with_capacity(self.num_elements());
        let mut push_chain = |ids: &[usize]| {
            for pair in ids.windows(2) {
                let id = elements.len() + 1;
                elements.push((id, [pair[0], pair[1]]));
            }
        };

        for bay in 1..=self.nbays {
            push_chain(&self.column_line_node_ids(bay - 1)?);
            for floor in 1..=self.nfloors {
                push_chain(&self.beam_node_ids(bay, floor, true)?);
            }
        }
        push_chain(&self.column_line_node_ids(self.nbays)?);
        Ok(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn portal() -> FrameMesh {
        FrameMesh::new(1, 1, 6.0, 4.0, 3, 2).unwrap()
    }

    #[test]
    fn test_counts() {
        let frame = portal();
        // Two columns of three nodes plus two internal beam nodes.
        assert_eq!(frame.num_nodes(), 8);
        assert_eq!(frame.num_elements(), 2 + 2 + 3);
        assert_eq!(frame.element_connectivity().unwrap().len(), frame.num_elements());
        assert_eq!(frame.node_coords().unwrap().len(), frame.num_nodes());
    }

    #[test]
    fn test_vertex_and_beam_numbering() {
        let frame = portal();
        assert_eq!(frame.vertex_id(0, 0).unwrap(), 1);
        assert_eq!(frame.vertex_id(0, 1).unwrap(), 3);
        assert_eq!(frame.vertex_id(1, 0).unwrap(), 6);
        assert_eq!(frame.vertex_id(1, 1).unwrap(), 8);
        assert_eq!(frame.beam_node_ids(1, 1, true).unwrap(), vec![3, 4, 5, 8]);
        assert!(frame.vertex_id(2, 0).is_err());
        assert!(frame.beam_node_ids(0, 1, false).is_err());
    }

    #[test]
    fn test_coordinates_follow_numbering() {
        let coords = portal().node_coords().unwrap();
        let ids: Vec<_> = coords.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
        assert_relative_eq!(coords[1].1[1], 2.0);
        assert_relative_eq!(coords[3].1[0], 2.0);
        assert_relative_eq!(coords[4].1[0], 4.0);
        assert_relative_eq!(coords[7].1[0], 6.0);
        assert_relative_eq!(coords[7].1[1], 4.0);
    }

    #[test]
    fn test_bases_and_out_of_plane_nodes() {
        let frame = FrameMesh::new(2, 3, 5.0, 3.0, 4, 2).unwrap();
        let bases = frame.column_bases();
        assert_eq!(bases.len(), 3);
        assert_eq!(frame.out_of_plane_nodes().len(), frame.num_nodes() - 3);
        for floor in 0..=3 {
            assert!(frame.vertex_id(2, floor).unwrap() <= frame.num_nodes());
        }
    }

    #[test]
    fn test_single_division_beams_have_no_internal_nodes() {
        let frame = FrameMesh::new(2, 1, 5.0, 3.0, 1, 1).unwrap();
        assert_eq!(frame.num_nodes(), 6);
        assert_eq!(frame.beam_node_ids(2, 1, true).unwrap(), vec![4, 6]);
    }
}
