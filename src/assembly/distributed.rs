//! Partitioned assembler
//!
//! The element list is cut into contiguous ranges, one per partition. A
//! node belongs to the partition of the first element that references it,
//! and DoFs are renumbered partition by partition so that each one owns a
//! contiguous block of equations. Every partition keeps its own copy of the
//! nodes, its row block of `K` and its blocks of the global vectors.
//!
//! Work is done in two phases per collective. First every partition works
//! on its own elements and nodes in parallel, writing contributions for
//! rows it does not own into per-target outboxes. Then, after all of them
//! have finished, each partition drains the outboxes addressed to it.

use log::{debug, trace, warn};
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ops::Range;

use super::import::owner_of;
use super::{out_of_balance_measure, Assembler, ImportPlan, InterfaceMap};
use crate::elements::{Element, Node, StiffnessTriplet, VectorEntry};
use crate::error::{SolverError, SolverResult};
use crate::math::{clear_values, kahan_norm_squared, scatter_triplets, DVec, PatternBuilder};
use crate::mesh::{write_displacements, GlobalMesh};

/// One partition's share of the global state
#[derive(Debug)]
pub struct Partition {
    rank: usize,
    rows: Range<usize>,
    elements: Range<usize>,
    owned_nodes: Vec<usize>,
    touched_nodes: Vec<usize>,
    nodes: Vec<Node>,
    k: CsrMatrix<f64>,
    p: DVec,
    r: DVec,
    g: DVec,
    u: DVec,
    delta_u: DVec,
    interface: InterfaceMap,
}

impl Partition {
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Global equations owned by this partition
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    /// Indices of this partition's elements in the mesh element list
    pub fn elements(&self) -> Range<usize> {
        self.elements.clone()
    }

    /// Indices of the nodes whose DoFs this partition owns
    pub fn owned_nodes(&self) -> &[usize] {
        &self.owned_nodes
    }

    pub fn interface(&self) -> &InterfaceMap {
        &self.interface
    }

    /// Row block of the stiffness, with global column numbers
    pub fn stiffness_block(&self) -> &CsrMatrix<f64> {
        &self.k
    }

    fn local_u(&self, row: usize) -> Option<f64> {
        if self.rows.contains(&row) {
            Some(self.u[row - self.rows.start])
        } else {
            self.interface.get(row)
        }
    }
}

/// Contributions one partition produced for every partition's rows
struct Outbox {
    stiffness: Vec<Vec<StiffnessTriplet>>,
    vector: Vec<Vec<VectorEntry>>,
}

impl Outbox {
    fn new(n: usize) -> Self {
        Self {
            stiffness: vec![Vec::new(); n],
            vector: vec![Vec::new(); n],
        }
    }
}

#[derive(Debug)]
pub struct DistributedAssembler {
    ndofs: usize,
    ranges: Vec<Range<usize>>,
    node_owner: Vec<usize>,
    partitions: Vec<Partition>,
    plan: ImportPlan,
    g_max: f64,
}

impl DistributedAssembler {
    /// Split `mesh` into `num_partitions` partitions and renumber its DoFs
    /// so each partition owns a contiguous block.
    ///
    /// There are never more partitions than elements.
    pub fn new(mesh: &mut GlobalMesh, num_partitions: usize) -> SolverResult<Self> {
        if num_partitions == 0 {
            return Err(SolverError::InvalidInput(
                "the distributed backend needs at least one partition".to_string(),
            ));
        }
        let num_elements = mesh.num_elements();
        if num_elements == 0 {
            return Err(SolverError::InvalidMesh("mesh has no elements".to_string()));
        }
        let n = num_partitions.min(num_elements);
        if n < num_partitions {
            warn!("Only {num_elements} elements; using {n} partitions instead of {num_partitions}");
        }

        let element_ranges = split_evenly(num_elements, n);
        let node_owner = assign_node_owners(mesh, &element_ranges);

        let mut order = Vec::with_capacity(mesh.num_nodes());
        for rank in 0..n {
            order.extend((0..node_owner.len()).filter(|&i| node_owner[i] == rank));
        }
        mesh.number_dofs_in_order(&order)?;
        mesh.map_element_stiffnesses();
        let ndofs = mesh.ndofs();

        let mut ranges = Vec::with_capacity(n);
        let mut start = 0;
        for rank in 0..n {
            let count: usize = (0..node_owner.len())
                .filter(|&i| node_owner[i] == rank)
                .map(|i| mesh.nodes()[i].num_active_dofs())
                .sum();
            ranges.push(start..start + count);
            start += count;
        }

        let mut builders: Vec<PatternBuilder> = ranges
            .iter()
            .map(|rows| PatternBuilder::with_shape(rows.len(), ndofs))
            .collect();
        for element in mesh.elements() {
            let dofs = element.global_dofs();
            for &row in &dofs {
                let owner = owner_of(&ranges, row).ok_or_else(|| {
                    SolverError::Assembly(format!("equation {row} has no owning partition"))
                })?;
                for &col in &dofs {
                    builders[owner].add(row - ranges[owner].start, col);
                }
            }
        }
        for (builder, rows) in builders.iter_mut().zip(&ranges) {
            for row in rows.clone() {
                builder.add(row - rows.start, row);
            }
        }

        let mut ghosts = vec![BTreeSet::new(); n];
        let mut touched = vec![BTreeSet::new(); n];
        for (rank, elements) in element_ranges.iter().enumerate() {
            for element in &mesh.elements()[elements.clone()] {
                touched[rank].extend(element.node_indices().iter().copied());
                ghosts[rank].extend(
                    element
                        .global_dofs()
                        .into_iter()
                        .filter(|row| !ranges[rank].contains(row)),
                );
            }
        }
        let plan = ImportPlan::new(&ranges, &ghosts)?;

        let mut partitions = Vec::with_capacity(n);
        for (rank, (builder, touched)) in builders.iter().zip(touched).enumerate() {
            let rows = ranges[rank].clone();
            let size = rows.len();
            partitions.push(Partition {
                rank,
                rows,
                elements: element_ranges[rank].clone(),
                owned_nodes: (0..node_owner.len()).filter(|&i| node_owner[i] == rank).collect(),
                touched_nodes: touched.into_iter().collect(),
                nodes: mesh.nodes().to_vec(),
                k: builder.to_csr()?,
                p: DVec::zeros(size),
                r: DVec::zeros(size),
                g: DVec::zeros(size),
                u: DVec::zeros(size),
                delta_u: DVec::zeros(size),
                interface: InterfaceMap::new(),
            });
        }

        for part in &partitions {
            debug!(
                "Partition {}: elements {:?}, equations {:?}, {} ghost equations",
                part.rank,
                part.elements,
                part.rows,
                plan.imports(part.rank).iter().map(|(_, rows)| rows.len()).sum::<usize>()
            );
        }

        Ok(Self {
            ndofs,
            ranges,
            node_owner,
            partitions,
            plan,
            g_max: 0.0,
        })
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn plan(&self) -> &ImportPlan {
        &self.plan
    }

    /// Refresh every partition's interface map from the owners' `U` blocks
    fn import_interface(&mut self) -> SolverResult<()> {
        let plan = &self.plan;
        let messages: Vec<Vec<(usize, Vec<(usize, f64)>)>> = self
            .partitions
            .par_iter()
            .map(|part| {
                plan.exports(part.rank)
                    .iter()
                    .map(|(target, rows)| {
                        let values = rows
                            .iter()
                            .map(|&row| (row, part.u[row - part.rows.start]))
                            .collect();
                        (*target, values)
                    })
                    .collect()
            })
            .collect();

        let mode = plan.mode();
        self.partitions.par_iter_mut().try_for_each(|part| {
            for (source, outgoing) in messages.iter().enumerate() {
                for (target, values) in outgoing {
                    if *target != part.rank {
                        continue;
                    }
                    trace!(
                        "Partition {source} -> {}: {} interface values ({mode:?})",
                        part.rank,
                        values.len()
                    );
                    for &(row, value) in values {
                        part.interface.combine(row, value, mode)?;
                    }
                }
            }
            Ok::<(), SolverError>(())
        })?;
        self.plan.mark_executed();
        Ok(())
    }

    /// Receive every outbox addressed to each partition, in source order
    fn drain_outboxes(
        &mut self,
        outboxes: &[Outbox],
        receive: impl Fn(&mut Partition, &Outbox) -> SolverResult<()> + Sync,
    ) -> SolverResult<()> {
        self.partitions.par_iter_mut().try_for_each(|part| {
            for outbox in outboxes {
                receive(part, outbox)?;
            }
            Ok::<(), SolverError>(())
        })
    }

    fn gather(&self, block: impl Fn(&Partition) -> &DVec) -> DVec {
        let mut global = DVec::zeros(self.ndofs);
        for part in &self.partitions {
            global.as_mut_slice()[part.rows.clone()].copy_from_slice(block(part).as_slice());
        }
        global
    }

    fn scatter(
        &mut self,
        global: &DVec,
        block: impl Fn(&mut Partition) -> &mut DVec,
    ) -> SolverResult<()> {
        if global.len() != self.ndofs {
            return Err(SolverError::Assembly(format!(
                "vector has {} entries for {} DoFs",
                global.len(),
                self.ndofs
            )));
        }
        for part in &mut self.partitions {
            let rows = part.rows.clone();
            block(part).copy_from_slice(&global.as_slice()[rows]);
        }
        Ok(())
    }
}

fn split_evenly(count: usize, parts: usize) -> Vec<Range<usize>> {
    let base = count / parts;
    let extra = count % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// A node belongs to the partition of the first element referencing it;
/// unreferenced nodes go to the first partition
fn assign_node_owners(mesh: &GlobalMesh, element_ranges: &[Range<usize>]) -> Vec<usize> {
    let mut owner: Vec<Option<usize>> = vec![None; mesh.num_nodes()];
    for (rank, elements) in element_ranges.iter().enumerate() {
        for element in &mesh.elements()[elements.clone()] {
            for &index in element.node_indices() {
                owner[index].get_or_insert(rank);
            }
        }
    }
    owner.into_iter().map(|o| o.unwrap_or(0)).collect()
}

fn route(ranges: &[Range<usize>], row: usize) -> SolverResult<usize> {
    owner_of(ranges, row)
        .ok_or_else(|| SolverError::Assembly(format!("equation {row} has no owning partition")))
}

impl Assembler for DistributedAssembler {
    fn name(&self) -> &str {
        "distributed"
    }

    fn ndofs(&self) -> usize {
        self.ndofs
    }

    fn assemble_global_p(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        mesh.calc_nodal_contributions_to_p();
        let nodes = mesh.nodes();
        let ranges = &self.ranges;
        let n = self.partitions.len();

        let outboxes: Vec<Outbox> = self
            .partitions
            .par_iter()
            .map(|part| -> SolverResult<Outbox> {
                let mut outbox = Outbox::new(n);
                for &index in &part.owned_nodes {
                    for &(row, load) in nodes[index].load_triplets() {
                        outbox.vector[route(ranges, row)?].push((row, load));
                    }
                }
                Ok(outbox)
            })
            .collect::<SolverResult<_>>()?;

        self.partitions.par_iter_mut().for_each(|part| part.p.fill(0.0));
        self.drain_outboxes(&outboxes, |part, outbox| {
            for &(row, load) in &outbox.vector[part.rank] {
                part.p[row - part.rows.start] += load;
            }
            Ok(())
        })
    }

    fn assemble_global_k_r(&mut self, mesh: &GlobalMesh) -> SolverResult<()> {
        let elements = mesh.elements();
        let ranges = &self.ranges;
        let n = self.partitions.len();

        let outboxes: Vec<Outbox> = self
            .partitions
            .par_iter()
            .map(|part| -> SolverResult<Outbox> {
                let mut outbox = Outbox::new(n);
                let mut stiffness = Vec::new();
                let mut resistance = Vec::new();
                for element in &elements[part.elements.clone()] {
                    stiffness.clear();
                    resistance.clear();
                    element.insert_stiffness_contributions(&mut stiffness);
                    element.insert_resistance_contributions(&mut resistance);
                    for &triplet in &stiffness {
                        outbox.stiffness[route(ranges, triplet.0)?].push(triplet);
                    }
                    for &entry in &resistance {
                        outbox.vector[route(ranges, entry.0)?].push(entry);
                    }
                }
                Ok(outbox)
            })
            .collect::<SolverResult<_>>()?;

        self.partitions.par_iter_mut().for_each(|part| {
            clear_values(&mut part.k);
            part.r.fill(0.0);
        });
        self.drain_outboxes(&outboxes, |part, outbox| {
            scatter_triplets(&mut part.k, &outbox.stiffness[part.rank], part.rows.start)?;
            for &(row, value) in &outbox.vector[part.rank] {
                part.r[row - part.rows.start] += value;
            }
            Ok(())
        })
    }

    fn map_u_to_nodes(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        self.import_interface()?;

        self.partitions.par_iter_mut().try_for_each(|part| {
            let mut nodes = std::mem::take(&mut part.nodes);
            let result = part
                .touched_nodes
                .iter()
                .try_for_each(|&index| {
                    write_displacements(&mut nodes[index], |row| part.local_u(row))
                });
            part.nodes = nodes;
            result
        })?;

        let (nodes, _) = mesh.split_mut();
        for (index, node) in nodes.iter_mut().enumerate() {
            let owner = &self.partitions[self.node_owner[index]];
            write_displacements(node, |row| owner.local_u(row))?;
        }
        Ok(())
    }

    fn update_element_states(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        let (_, mut rest) = mesh.split_mut();
        let mut chunks: Vec<&mut [Box<dyn Element>]> = Vec::with_capacity(self.partitions.len());
        for part in &self.partitions {
            if part.elements.len() > rest.len() {
                return Err(SolverError::Assembly(format!(
                    "partition {} expects {} elements but only {} remain",
                    part.rank,
                    part.elements.len(),
                    rest.len()
                )));
            }
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(part.elements.len());
            chunks.push(head);
            rest = tail;
        }

        self.partitions
            .par_iter()
            .zip(chunks.into_par_iter())
            .for_each(|(part, elements)| {
                for element in elements.iter_mut() {
                    element.update_state(&part.nodes);
                }
            });
        Ok(())
    }

    fn calculate_out_of_balance(&mut self) {
        self.partitions
            .par_iter_mut()
            .for_each(|part| part.g = &part.r - &part.p);
    }

    fn increment_u(&mut self) {
        self.partitions
            .par_iter_mut()
            .for_each(|part| part.u += &part.delta_u);
    }

    fn check_convergence(&mut self, tolerance: f64) -> bool {
        let partial: Vec<f64> = self
            .partitions
            .par_iter()
            .map(|part| kahan_norm_squared(part.g.as_slice()))
            .collect();
        // All-reduce in rank order so every run sums identically.
        let total = partial.iter().fold(0.0, |acc, v| acc + v);
        trace!("Out-of-balance partial sums: {partial:?}");
        self.g_max = out_of_balance_measure(total);
        self.g_max < tolerance
    }

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn stiffness(&self) -> SolverResult<Cow<'_, CsrMatrix<f64>>> {
        let nnz: usize = self.partitions.iter().map(|part| part.k.nnz()).sum();
        let mut offsets = Vec::with_capacity(self.ndofs + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        offsets.push(0);
        for part in &self.partitions {
            let (block_offsets, block_indices, block_values) = part.k.csr_data();
            let base = indices.len();
            offsets.extend(block_offsets[1..].iter().map(|o| base + o));
            indices.extend_from_slice(block_indices);
            values.extend_from_slice(block_values);
        }
        let k = CsrMatrix::try_from_csr_data(self.ndofs, self.ndofs, offsets, indices, values)
            .map_err(|e| SolverError::Assembly(format!("cannot gather stiffness: {e}")))?;
        Ok(Cow::Owned(k))
    }

    fn p(&self) -> Cow<'_, DVec> {
        Cow::Owned(self.gather(|part| &part.p))
    }

    fn r(&self) -> Cow<'_, DVec> {
        Cow::Owned(self.gather(|part| &part.r))
    }

    fn g(&self) -> Cow<'_, DVec> {
        Cow::Owned(self.gather(|part| &part.g))
    }

    fn u(&self) -> Cow<'_, DVec> {
        Cow::Owned(self.gather(|part| &part.u))
    }

    fn delta_u(&self) -> Cow<'_, DVec> {
        Cow::Owned(self.gather(|part| &part.delta_u))
    }

    fn set_u(&mut self, u: &DVec) -> SolverResult<()> {
        self.scatter(u, |part| &mut part.u)
    }

    fn set_delta_u(&mut self, delta_u: &DVec) -> SolverResult<()> {
        self.scatter(delta_u, |part| &mut part.delta_u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::LocalAssembler;
    use crate::elements::{ElementTemplate, NodalRestraint};
    use crate::loads::LoadManager;
    use crate::sections::BasicSection;
    use approx::assert_relative_eq;
    use nalgebra_sparse::convert::serial::convert_csr_dense;

    fn beam(divisions: usize) -> (GlobalMesh, LoadManager) {
        let template = ElementTemplate::LinearElastic(BasicSection::new(2.06e11, 0.0125, 4.57e-4));
        let mut mesh = GlobalMesh::create_line_mesh(
            divisions,
            [[0.0, 0.0, 0.0], [divisions as f64, 0.0, 0.0]],
            &template,
        )
        .unwrap();
        NodalRestraint::fixed().with_nodes([1]).apply_restraints(&mut mesh).unwrap();
        NodalRestraint::out_of_plane()
            .with_nodes(2..=divisions + 1)
            .apply_restraints(&mut mesh)
            .unwrap();
        let mut loads = LoadManager::new();
        loads
            .create_a_nodal_load_by_id(&[divisions + 1], &[2], &[-1e3], &mesh)
            .unwrap();
        loads.initialise_loads(&mut mesh).unwrap();
        (mesh, loads)
    }

    #[test]
    fn test_split_evenly() {
        assert_eq!(split_evenly(7, 3), vec![0..3, 3..5, 5..7]);
        assert_eq!(split_evenly(2, 2), vec![0..1, 1..2]);
    }

    #[test]
    fn test_partitions_own_contiguous_blocks() {
        let (mut mesh, _) = beam(6);
        let assembler = DistributedAssembler::new(&mut mesh, 3).unwrap();
        assert_eq!(assembler.ndofs(), 18);

        let mut next = 0;
        for part in assembler.partitions() {
            assert_eq!(part.rows().start, next);
            next = part.rows().end;
            assert_eq!(part.elements().len(), 2);
            for &index in part.owned_nodes() {
                let node = &mesh.nodes()[index];
                assert!(node.dofs_numbers().iter().all(|row| part.rows().contains(row)));
            }
        }
        assert_eq!(next, 18);
        // Each internal cut shares one node of three active DoFs.
        assert_eq!(assembler.plan().num_imported(), 6);
    }

    #[test]
    fn test_too_many_partitions_are_capped() {
        let (mut mesh, _) = beam(2);
        assert!(DistributedAssembler::new(&mut mesh, 0).is_err());
        let assembler = DistributedAssembler::new(&mut mesh, 5).unwrap();
        assert_eq!(assembler.num_partitions(), 2);
    }

    #[test]
    fn test_matches_local_assembly() {
        let u_of = |i: usize| 1e-4 * ((i % 5) as f64 - 2.0);

        let (mut local_mesh, local_loads) = beam(6);
        let mut local = LocalAssembler::new(&mut local_mesh).unwrap();
        local_loads.increment_loads(&mut local_mesh, 1.0).unwrap();

        let (mut dist_mesh, dist_loads) = beam(6);
        let mut dist = DistributedAssembler::new(&mut dist_mesh, 3).unwrap();
        dist_loads.increment_loads(&mut dist_mesh, 1.0).unwrap();

        // Both number DoFs node by node along the beam, so vectors line up.
        let u = DVec::from_fn(18, |i, _| u_of(i));
        for (assembler, mesh) in [
            (&mut local as &mut dyn Assembler, &mut local_mesh),
            (&mut dist as &mut dyn Assembler, &mut dist_mesh),
        ] {
            assembler.set_u(&u).unwrap();
            assembler.assemble_global_p(mesh).unwrap();
            assembler.map_u_to_nodes(mesh).unwrap();
            assembler.update_element_states(mesh).unwrap();
            assembler.assemble_global_k_r(mesh).unwrap();
            assembler.calculate_out_of_balance();
            assembler.check_convergence(1.0);
        }

        let k_local = convert_csr_dense(&local.stiffness().unwrap());
        let k_dist = convert_csr_dense(&dist.stiffness().unwrap());
        assert_relative_eq!(k_local, k_dist, epsilon = 1e-3);
        assert_relative_eq!(local.g().into_owned(), dist.g().into_owned(), epsilon = 1e-6);
        assert_relative_eq!(local.p().into_owned(), dist.p().into_owned());
        assert_relative_eq!(local.g_max(), dist.g_max(), max_relative = 1e-10);

        for (a, b) in local_mesh.nodes().iter().zip(dist_mesh.nodes()) {
            assert_eq!(a.nodal_displacements(), b.nodal_displacements());
        }
    }

    #[test]
    fn test_interface_switches_to_replace() {
        let (mut mesh, _) = beam(4);
        let mut assembler = DistributedAssembler::new(&mut mesh, 2).unwrap();
        assembler.map_u_to_nodes(&mut mesh).unwrap();
        assert_eq!(assembler.plan().mode(), crate::assembly::CombineMode::Replace);

        let u = DVec::from_fn(12, |i, _| i as f64);
        assembler.set_u(&u).unwrap();
        assembler.map_u_to_nodes(&mut mesh).unwrap();
        let second = &assembler.partitions()[1];
        assert_eq!(second.interface().len(), 3);
        for row in second.interface().rows() {
            assert_eq!(second.interface().get(row), Some(row as f64));
        }
    }
}
