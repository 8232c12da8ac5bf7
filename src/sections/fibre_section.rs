//! Fibre section integrator for beam-columns
//!
//! Reduces the uniaxial response of many fibres to an axial force and bending
//! moment about the tangent-stiffness-weighted centroid, together with the
//! 2x2 tangent constitutive matrix
//!
//! ```text
//! D_t = | sum(A E_t)          -sum(A E_t y')   |
//!       | -sum(A E_t y')       sum(A E_t y'^2) |
//! ```
//!
//! where `y' = y - y_bar`. Positive curvature shortens fibres above the
//! centroid.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use super::Fibre;
use crate::error::{SolverError, SolverResult};
use crate::materials::Material1D;

/// Read-only snapshot of a section's generalised state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub axial_strain: f64,
    pub curvature: f64,
    pub axial_force: f64,
    pub moment: f64,
    pub centroid: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FibreSection {
    fibres: Vec<Fibre>,

    section_area: f64,
    weighted_modulus: f64,
    y_bar: f64,

    axial_strain: f64,
    curvature: f64,
    starting_axial_strain: f64,
    starting_curvature: f64,

    axial_force: f64,
    moment: f64,
    tangent: Matrix2<f64>,
}

impl FibreSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one fibre per `(area, y)` pair, each with a fresh copy of `material`
    pub fn add_fibres(
        &mut self,
        material: &dyn Material1D,
        areas: &[f64],
        ys: &[f64],
    ) -> SolverResult<()> {
        if areas.len() != ys.len() {
            return Err(SolverError::MismatchedFibreInput {
                areas: areas.len(),
                positions: ys.len(),
            });
        }
        self.fibres.extend(
            areas
                .iter()
                .zip(ys)
                .map(|(&area, &y)| Fibre::new(material, area, y)),
        );
        self.calc_area_weighted_modulus();
        self.calc_section_centroid();
        self.calc_tangent_constitutive_matrix();
        Ok(())
    }

    /// Discretised I-section with its bottom flange face at `offset`.
    ///
    /// Flanges get `flange_divisions` fibres each through their thickness and
    /// the clear web depth gets `web_divisions` fibres.
    #[allow(clippy::too_many_arguments)]
    pub fn i_section(
        material: &dyn Material1D,
        offset: f64,
        tf: f64,
        b: f64,
        tw: f64,
        h: f64,
        flange_divisions: usize,
        web_divisions: usize,
    ) -> SolverResult<Self> {
        if flange_divisions == 0 || web_divisions == 0 {
            return Err(SolverError::InvalidInput(
                "I-section needs at least one flange and one web division".to_string(),
            ));
        }
        let d = h - 2.0 * tf;
        let nf = flange_divisions as f64;
        let nw = web_divisions as f64;
        let mut areas = Vec::with_capacity(2 * flange_divisions + web_divisions);
        let mut ys = Vec::with_capacity(areas.capacity());

        for i in 0..flange_divisions {
            areas.push(b * tf / nf);
            ys.push(offset + (i as f64 + 0.5) * tf / nf);
        }
        for i in 0..web_divisions {
            areas.push(d * tw / nw);
            ys.push(offset + tf + (i as f64 + 0.5) * d / nw);
        }
        for i in 0..flange_divisions {
            areas.push(b * tf / nf);
            ys.push(offset + h - tf + (i as f64 + 0.5) * tf / nf);
        }

        let mut section = Self::new();
        section.add_fibres(material, &areas, &ys)?;
        Ok(section)
    }

    /// Solid rectangle `b x h` split into `divisions` layers, centred on y = 0
    pub fn rectangular(
        material: &dyn Material1D,
        b: f64,
        h: f64,
        divisions: usize,
    ) -> SolverResult<Self> {
        if divisions == 0 {
            return Err(SolverError::InvalidInput(
                "rectangular section needs at least one division".to_string(),
            ));
        }
        let n = divisions as f64;
        let areas = vec![b * h / n; divisions];
        let ys: Vec<f64> = (0..divisions)
            .map(|i| -0.5 * h + (i as f64 + 0.5) * h / n)
            .collect();
        let mut section = Self::new();
        section.add_fibres(material, &areas, &ys)?;
        Ok(section)
    }

    /// Update the section to the total generalised strains `(axial_strain, curvature)`.
    ///
    /// Fibre strains are incremented by the change since the last commit,
    /// measured about a centroid computed from the tangent moduli that the
    /// fibres held *before* this update.
    pub fn update_section_state(&mut self, axial_strain: f64, curvature: f64) {
        self.calc_area_weighted_modulus();
        self.calc_section_centroid();

        self.axial_strain = axial_strain;
        self.curvature = curvature;
        let d_axial = self.axial_strain - self.starting_axial_strain;
        let d_curvature = self.curvature - self.starting_curvature;

        let y_bar = self.y_bar;
        for fibre in &mut self.fibres {
            fibre.increment_strain(d_axial - (fibre.y() - y_bar) * d_curvature);
        }

        self.calc_section_forces();
        self.calc_tangent_constitutive_matrix();
    }

    /// Commit every fibre's material and the section strains
    pub fn update_starting_state(&mut self) {
        for fibre in &mut self.fibres {
            fibre.commit();
        }
        self.starting_axial_strain = self.axial_strain;
        self.starting_curvature = self.curvature;
    }

    fn calc_area_weighted_modulus(&mut self) {
        self.section_area = self.fibres.iter().map(Fibre::area).sum();
        let stiffness: f64 = self
            .fibres
            .iter()
            .map(|f| f.area() * f.material().tangent_modulus())
            .sum();
        self.weighted_modulus = if self.section_area > 0.0 {
            stiffness / self.section_area
        } else {
            0.0
        };
    }

    fn calc_section_centroid(&mut self) {
        let axial_stiffness = self.section_area * self.weighted_modulus;
        // A section with no tangent stiffness left keeps its last centroid.
        if axial_stiffness == 0.0 {
            return;
        }
        let first_moment: f64 = self
            .fibres
            .iter()
            .map(|f| f.y() * f.area() * f.material().tangent_modulus())
            .sum();
        self.y_bar = first_moment / axial_stiffness;
    }

    fn calc_section_forces(&mut self) {
        let y_bar = self.y_bar;
        self.axial_force = self.fibres.iter().map(Fibre::force).sum();
        self.moment = self
            .fibres
            .iter()
            .map(|f| f.force() * -(f.y() - y_bar))
            .sum();
    }

    fn calc_tangent_constitutive_matrix(&mut self) {
        let y_bar = self.y_bar;
        let (mut d00, mut d01, mut d11) = (0.0, 0.0, 0.0);
        for fibre in &self.fibres {
            let ae = fibre.area() * fibre.material().tangent_modulus();
            let dy = fibre.y() - y_bar;
            d00 += ae;
            d01 -= ae * dy;
            d11 += ae * dy * dy;
        }
        self.tangent = Matrix2::new(d00, d01, d01, d11);
    }

    pub fn fibres(&self) -> &[Fibre] {
        &self.fibres
    }

    pub fn num_fibres(&self) -> usize {
        self.fibres.len()
    }

    pub fn section_area(&self) -> f64 {
        self.section_area
    }

    /// Area-weighted tangent modulus
    pub fn weighted_modulus(&self) -> f64 {
        self.weighted_modulus
    }

    /// Tangent-stiffness-weighted centroid
    pub fn centroid(&self) -> f64 {
        self.y_bar
    }

    pub fn axial_force(&self) -> f64 {
        self.axial_force
    }

    pub fn moment(&self) -> f64 {
        self.moment
    }

    pub fn axial_strain(&self) -> f64 {
        self.axial_strain
    }

    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    /// Section resultants `[N, M]`
    pub fn resultants(&self) -> Vector2<f64> {
        Vector2::new(self.axial_force, self.moment)
    }

    /// Tangent constitutive matrix `D_t`
    pub fn tangent(&self) -> Matrix2<f64> {
        self.tangent
    }

    pub fn summary(&self) -> SectionSummary {
        SectionSummary {
            axial_strain: self.axial_strain,
            curvature: self.curvature,
            axial_force: self.axial_force,
            moment: self.moment,
            centroid: self.y_bar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::ElasticPlasticMaterial;
    use approx::assert_relative_eq;

    const E: f64 = 2.06e11;
    const FY: f64 = 550e6;
    const PERCENT_TOLERANCE: f64 = 0.02;

    // UB 457x191x98
    const TF: f64 = 19.6e-3;
    const TW: f64 = 11.4e-3;
    const B: f64 = 192.8e-3;
    const H: f64 = 467.2e-3;

    fn steel() -> ElasticPlasticMaterial {
        ElasticPlasticMaterial::new(E, FY, 0.0)
    }

    fn ub_section(offset: f64) -> FibreSection {
        FibreSection::i_section(&steel(), offset, TF, B, TW, H, 10, 40).unwrap()
    }

    fn second_moment() -> f64 {
        let d = H - 2.0 * TF;
        TW * d.powi(3) / 12.0
            + 2.0 * B * TF.powi(3) / 12.0
            + 2.0 * TF * B * (0.5 * H - 0.5 * TF).powi(2)
    }

    fn elastic_moment() -> f64 {
        second_moment() / (H / 2.0) * FY
    }

    fn plastic_moment() -> f64 {
        let d = H - 2.0 * TF;
        FY * TF * B * (H - TF) + FY * (0.5 * H - TF) * TW * (0.5 * d)
    }

    #[test]
    fn test_mismatched_input_is_rejected() {
        let mut section = FibreSection::new();
        let err = section.add_fibres(&steel(), &[1.0, 2.0], &[0.0]).unwrap_err();
        assert!(matches!(
            err,
            SolverError::MismatchedFibreInput { areas: 2, positions: 1 }
        ));
        assert_eq!(section.num_fibres(), 0);
    }

    #[test]
    fn test_section_area() {
        let section = ub_section(0.0);
        let expected = TF * B * 2.0 + (H - 2.0 * TF) * TW;
        assert_relative_eq!(section.section_area(), expected, max_relative = 1e-9);
        assert_relative_eq!(section.weighted_modulus(), E, max_relative = 1e-9);
    }

    #[test]
    fn test_centroid_is_translation_invariant() {
        for offset in [0.0, -0.3, 2.5] {
            let mut section = ub_section(offset);
            section.update_section_state(0.0, 0.0);
            assert_relative_eq!(section.centroid(), offset + H / 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_elastic_moment_at_elastic_curvature() {
        let mut section = ub_section(0.0);
        let kappa_elastic = elastic_moment() / (E * second_moment());
        section.update_section_state(0.0, kappa_elastic);

        let error = (section.moment() - elastic_moment()).abs() / elastic_moment();
        assert!(error < PERCENT_TOLERANCE, "relative error {error}");
        assert!(section.axial_force().abs() < 1e-3 * elastic_moment());
        assert!(section.fibres().iter().all(|f| f.material().is_elastic()));
    }

    #[test]
    fn test_plastic_moment_well_past_yield() {
        let mut section = ub_section(0.0);
        let d = H - 2.0 * TF;
        let kappa_plastic = FY / (E * (d / 40.0) * 0.5);
        section.update_section_state(0.0, kappa_plastic);

        let error = (section.moment() - plastic_moment()).abs() / plastic_moment();
        assert!(error < PERCENT_TOLERANCE, "relative error {error}");
    }

    #[test]
    fn test_tangent_matrix_is_symmetric_and_uncoupled() {
        let mut section = ub_section(1.0);
        section.update_section_state(1e-4, 1e-4);
        let d = section.tangent();
        assert_relative_eq!(d[(0, 1)], d[(1, 0)]);
        assert!(d[(0, 1)].abs() < 1e-6 * d[(0, 0)]);
        assert_relative_eq!(d[(1, 1)], E * second_moment(), max_relative = PERCENT_TOLERANCE);
    }

    #[test]
    fn test_uncommitted_updates_are_repeatable() {
        let mut section = ub_section(0.0);
        section.update_section_state(2e-3, 0.0);
        let first = section.axial_force();
        section.update_section_state(2e-3, 0.0);
        assert_relative_eq!(section.axial_force(), first);
    }

    #[test]
    fn test_commit_moves_reference_strains() {
        let mut section = ub_section(0.0);
        section.update_section_state(1e-4, 0.0);
        section.update_starting_state();
        let committed = section.axial_force();

        section.update_section_state(1e-4, 0.0);
        assert_relative_eq!(section.axial_force(), committed, max_relative = 1e-12);
        section.update_section_state(2e-4, 0.0);
        assert_relative_eq!(section.axial_force(), 2.0 * committed, max_relative = 1e-9);
    }

    #[test]
    fn test_cloned_sections_do_not_share_fibres() {
        let template = ub_section(0.0);
        let mut a = template.clone();
        a.update_section_state(1e-3, 0.0);
        assert_eq!(template.axial_force(), 0.0);
        assert!(a.axial_force() > 0.0);
    }

    #[test]
    fn test_rectangular_section_stiffness() {
        let mut section = FibreSection::rectangular(&steel(), 0.1, 0.2, 200).unwrap();
        section.update_section_state(0.0, 1e-5);
        let i = 0.1 * 0.2_f64.powi(3) / 12.0;
        assert_relative_eq!(section.tangent()[(1, 1)], E * i, max_relative = 1e-4);
        assert_relative_eq!(section.centroid(), 0.0, epsilon = 1e-12);
    }
}
