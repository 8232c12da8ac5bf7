//! Single-process assembler

use log::debug;
use nalgebra_sparse::CsrMatrix;
use std::borrow::Cow;

use super::{g_max_of, Assembler};
use crate::elements::{StiffnessTriplet, VectorEntry};
use crate::error::{SolverError, SolverResult};
use crate::math::{clear_values, scatter_triplets, DVec, PatternBuilder};
use crate::mesh::GlobalMesh;

#[derive(Debug)]
pub struct LocalAssembler {
    k: CsrMatrix<f64>,
    p: DVec,
    r: DVec,
    g: DVec,
    u: DVec,
    delta_u: DVec,
    g_max: f64,
    stiffness_buffer: Vec<StiffnessTriplet>,
    resistance_buffer: Vec<VectorEntry>,
}

impl LocalAssembler {
    /// Number the DoFs of `mesh` and build the stiffness pattern from the
    /// element connectivity
    pub fn new(mesh: &mut GlobalMesh) -> SolverResult<Self> {
        mesh.number_dofs();
        mesh.map_element_stiffnesses();
        let ndofs = mesh.ndofs();

        let mut pattern = PatternBuilder::new(ndofs);
        for element in mesh.elements() {
            pattern.add_connectivity(&element.global_dofs());
        }
        // Diagonal is always stored, connected or not
        for dof in 0..ndofs {
            pattern.add(dof, dof);
        }
        let k = pattern.to_csr()?;
        debug!("Local assembler: {ndofs} DoFs, {} stored stiffness entries", k.nnz());

        Ok(Self {
            k,
            p: DVec::zeros(ndofs),
            r: DVec::zeros(ndofs),
            g: DVec::zeros(ndofs),
            u: DVec::zeros(ndofs),
            delta_u: DVec::zeros(ndofs),
            g_max: 0.0,
            stiffness_buffer: Vec::new(),
            resistance_buffer: Vec::new(),
        })
    }

    /// Stiffness without the [`Cow`] wrapper
    pub fn stiffness_matrix(&self) -> &CsrMatrix<f64> {
        &self.k
    }

    fn check_len(&self, v: &DVec, what: &str) -> SolverResult<()> {
        if v.len() == self.ndofs() {
            Ok(())
        } else {
            Err(SolverError::Assembly(format!(
                "{what} has {} entries for {} DoFs",
                v.len(),
                self.ndofs()
            )))
        }
    }
}

impl Assembler for LocalAssembler {
    fn name(&self) -> &str {
        "local"
    }

    fn ndofs(&self) -> usize {
        self.p.len()
    }

    fn assemble_global_p(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        mesh.calc_nodal_contributions_to_p();
        self.p.fill(0.0);
        for node in mesh.nodes() {
            for &(row, load) in node.load_triplets() {
                let entry = self.p.get_mut(row).ok_or_else(|| {
                    SolverError::Assembly(format!("load on equation {row} outside the system"))
                })?;
                *entry += load;
            }
        }
        Ok(())
    }

    fn assemble_global_k_r(&mut self, mesh: &GlobalMesh) -> SolverResult<()> {
        clear_values(&mut self.k);
        self.r.fill(0.0);

        for element in mesh.elements() {
            self.stiffness_buffer.clear();
            self.resistance_buffer.clear();
            element.insert_stiffness_contributions(&mut self.stiffness_buffer);
            element.insert_resistance_contributions(&mut self.resistance_buffer);

            scatter_triplets(&mut self.k, &self.stiffness_buffer, 0)?;
            for &(row, value) in &self.resistance_buffer {
                let entry = self.r.get_mut(row).ok_or_else(|| {
                    SolverError::Assembly(format!(
                        "element {} writes equation {row} outside the system",
                        element.id()
                    ))
                })?;
                *entry += value;
            }
        }
        Ok(())
    }

    fn map_u_to_nodes(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        mesh.map_u_to_nodes(&self.u)
    }

    fn update_element_states(&mut self, mesh: &mut GlobalMesh) -> SolverResult<()> {
        mesh.update_element_states();
        Ok(())
    }

    fn calculate_out_of_balance(&mut self) {
        self.g = &self.r - &self.p;
    }

    fn increment_u(&mut self) {
        self.u += &self.delta_u;
    }

    fn check_convergence(&mut self, tolerance: f64) -> bool {
        self.g_max = g_max_of(self.g.as_slice());
        self.g_max < tolerance
    }

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn stiffness(&self) -> SolverResult<Cow<'_, CsrMatrix<f64>>> {
        Ok(Cow::Borrowed(&self.k))
    }

    fn p(&self) -> Cow<'_, DVec> {
        Cow::Borrowed(&self.p)
    }

    fn r(&self) -> Cow<'_, DVec> {
        Cow::Borrowed(&self.r)
    }

    fn g(&self) -> Cow<'_, DVec> {
        Cow::Borrowed(&self.g)
    }

    fn u(&self) -> Cow<'_, DVec> {
        Cow::Borrowed(&self.u)
    }

    fn delta_u(&self) -> Cow<'_, DVec> {
        Cow::Borrowed(&self.delta_u)
    }

    fn set_u(&mut self, u: &DVec) -> SolverResult<()> {
        self.check_len(u, "displacement vector")?;
        self.u.copy_from(u);
        Ok(())
    }

    fn set_delta_u(&mut self, delta_u: &DVec) -> SolverResult<()> {
        self.check_len(delta_u, "displacement increment")?;
        self.delta_u.copy_from(delta_u);
        Ok(())
    }
}
