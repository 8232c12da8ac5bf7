//! Bilinear elastic-plastic material with isotropic hardening
//!
//! Follows the return scheme in Bhatti, *Advanced Topics in Finite Element
//! Analysis of Structures* (2006), section 7.1.3. A strain increment that
//! crosses the yield surface is split by the blend factor `beta` into an
//! elastic part and a plastic part.

use serde::{Deserialize, Serialize};

use super::Material1D;

/// Snapshot of every mutable field of the material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialState {
    /// Young's modulus in Pa
    pub youngs_modulus: f64,
    /// Tangent modulus in Pa
    pub tangent_modulus: f64,
    /// Initial yield stress in Pa
    pub yield_stress: f64,
    /// Hardened yield stress (yield surface) in Pa
    pub yield_surface: f64,
    pub stress: f64,
    pub strain: f64,
    /// Accumulated equivalent plastic strain
    pub plastic_strain: f64,
    pub elastic: bool,
}

impl MaterialState {
    fn virgin(youngs_modulus: f64, yield_stress: f64) -> Self {
        Self {
            youngs_modulus,
            tangent_modulus: youngs_modulus,
            yield_stress,
            yield_surface: yield_stress,
            stress: 0.0,
            strain: 0.0,
            plastic_strain: 0.0,
            elastic: true,
        }
    }
}

/// Elastic-plastic uniaxial material.
///
/// `hardening` is the plastic modulus `H`, so the post-yield tangent is
/// `E*H/(E + H)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticPlasticMaterial {
    hardening: f64,
    current: MaterialState,
    starting: MaterialState,
    beta: f64,
    loading: bool,
}

impl ElasticPlasticMaterial {
    /// Create a material in its virgin state
    pub fn new(youngs_modulus: f64, yield_stress: f64, hardening: f64) -> Self {
        let state = MaterialState::virgin(youngs_modulus, yield_stress);
        Self {
            hardening,
            current: state,
            starting: state,
            beta: 0.0,
            loading: false,
        }
    }

    /// Structural steel with the given hardening ratio `H/E`
    pub fn steel(yield_stress: f64, hardening_ratio: f64) -> Self {
        let e = 2.06e11;
        Self::new(e, yield_stress, hardening_ratio * e)
    }

    /// Reset both states to the virgin state with new reference properties
    pub fn initialise(&mut self, youngs_modulus: f64, yield_stress: f64, hardening: f64) {
        *self = Self::new(youngs_modulus, yield_stress, hardening);
    }

    pub fn hardening(&self) -> f64 {
        self.hardening
    }

    /// Current (trial) state
    pub fn current_state(&self) -> &MaterialState {
        &self.current
    }

    /// Last committed state
    pub fn starting_state(&self) -> &MaterialState {
        &self.starting
    }

    /// Blend factor of the last increment: the elastic fraction of the step
    pub fn beta(&self) -> f64 {
        self.beta
    }

    fn plastic_tangent(&self) -> f64 {
        let e = self.current.youngs_modulus;
        e * self.hardening / (e + self.hardening)
    }

    fn check_loading(&mut self, delta_stress: f64) {
        self.loading = self.current.stress * delta_stress >= 0.0;
    }

    fn calc_plastic_flow(&mut self, d_strain: f64) {
        let ratio = self.hardening / self.current.youngs_modulus;
        self.current.plastic_strain += ((1.0 - self.beta) / (1.0 + ratio)) * d_strain.abs();
    }
}

impl Material1D for ElasticPlasticMaterial {
    fn increment_strain(&mut self, d_strain: f64) {
        self.current = self.starting;

        let delta_stress = self.current.youngs_modulus * d_strain;
        self.check_loading(delta_stress);
        let trial_stress = self.current.stress + delta_stress;

        self.evolve_yield_surface();
        self.current.strain += d_strain;

        if self.current.elastic {
            if trial_stress.abs() < self.current.yield_surface {
                self.current.stress = trial_stress;
                return;
            }
            self.current.elastic = false;
            self.current.tangent_modulus = self.plastic_tangent();
            let stress_magnitude = self.current.stress.abs();
            self.beta = (self.current.yield_surface - stress_magnitude)
                / (trial_stress.abs() - stress_magnitude);
        } else if self.loading {
            self.beta = 0.0;
        } else {
            self.current.elastic = true;
            self.current.tangent_modulus = self.current.youngs_modulus;
            self.current.stress = trial_stress;
            return;
        }

        self.current.stress += self.beta * delta_stress
            + self.plastic_tangent() * (1.0 - self.beta) * d_strain;
        self.calc_plastic_flow(d_strain);
    }

    fn evolve_yield_surface(&mut self) {
        self.current.yield_surface =
            self.current.yield_stress + self.hardening * self.current.plastic_strain;
    }

    fn update_starting_state(&mut self) {
        self.starting = self.current;
    }

    fn stress(&self) -> f64 {
        self.current.stress
    }

    fn strain(&self) -> f64 {
        self.current.strain
    }

    fn youngs_modulus(&self) -> f64 {
        self.current.youngs_modulus
    }

    fn tangent_modulus(&self) -> f64 {
        self.current.tangent_modulus
    }

    fn yield_surface(&self) -> f64 {
        self.current.yield_surface
    }

    fn plastic_strain(&self) -> f64 {
        self.current.plastic_strain
    }

    fn is_elastic(&self) -> bool {
        self.current.elastic
    }

    fn clone_box(&self) -> Box<dyn Material1D> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const E: f64 = 2.06e11;
    const FY: f64 = 550e6;
    const H_RATIO: f64 = 0.02;
    const TOL: f64 = 1e-6;

    fn steel() -> ElasticPlasticMaterial {
        ElasticPlasticMaterial::new(E, FY, H_RATIO * E)
    }

    fn yield_strain() -> f64 {
        FY / E
    }

    fn plastic_tangent() -> f64 {
        E * H_RATIO * E / (E + H_RATIO * E)
    }

    #[test]
    fn test_virgin_state() {
        let mat = steel();
        assert_eq!(mat.stress(), 0.0);
        assert_eq!(mat.plastic_strain(), 0.0);
        assert_eq!(mat.tangent_modulus(), E);
        assert_eq!(mat.yield_surface(), FY);
        assert!(mat.is_elastic());
    }

    #[test]
    fn test_elastic_tension_and_compression() {
        for sign in [1.0, -1.0] {
            let mut mat = steel();
            let strain = sign * 0.9 * yield_strain();
            mat.increment_strain(strain);
            assert_relative_eq!(mat.stress(), E * strain, max_relative = TOL);
            assert_relative_eq!(mat.strain(), strain, max_relative = TOL);
            assert!(mat.is_elastic());
        }
    }

    #[test]
    fn test_plastic_tension_and_compression() {
        for sign in [1.0, -1.0] {
            let mut mat = steel();
            mat.increment_strain(sign * 1.1 * yield_strain());
            let expected = sign * (FY + plastic_tangent() * 0.1 * yield_strain());
            assert_relative_eq!(mat.stress(), expected, max_relative = TOL);
            assert!(!mat.is_elastic());
            assert_relative_eq!(mat.tangent_modulus(), plastic_tangent(), max_relative = TOL);
        }
    }

    #[test]
    fn test_increments_restart_from_committed_state() {
        let mut mat = steel();
        mat.increment_strain(1.1 * yield_strain());
        mat.increment_strain(0.5 * yield_strain());
        assert_relative_eq!(mat.stress(), 0.5 * FY, max_relative = TOL);
        assert!(mat.is_elastic());
        assert_eq!(mat.plastic_strain(), 0.0);
    }

    #[test]
    fn test_yield_onset() {
        let mut mat = steel();
        mat.increment_strain(yield_strain());
        assert_relative_eq!(mat.stress().abs(), FY, max_relative = TOL);

        let mut mat = steel();
        mat.increment_strain(1.0001 * yield_strain());
        assert!(!mat.is_elastic());
    }

    #[test]
    fn test_unloading_after_yield_is_elastic() {
        for sign in [1.0, -1.0] {
            let mut mat = steel();
            mat.increment_strain(sign * 1.1 * yield_strain());
            let max_stress = mat.stress();
            mat.update_starting_state();

            mat.increment_strain(-sign * 0.2 * yield_strain());
            assert_relative_eq!(
                mat.stress(),
                max_stress - sign * 0.2 * yield_strain() * E,
                max_relative = TOL
            );
            assert!(mat.is_elastic());
            assert_relative_eq!(mat.tangent_modulus(), E, max_relative = TOL);
        }
    }

    #[test]
    fn test_plastic_strain_and_hardened_yield() {
        let mut mat = steel();
        let applied = 1.1 * yield_strain();
        mat.increment_strain(applied);
        let max_stress = mat.stress();

        let beta = (yield_strain() + (max_stress - FY) / E) / applied;
        let expected_plastic = applied * (1.0 - beta);
        assert_relative_eq!(mat.plastic_strain(), expected_plastic, max_relative = TOL);

        mat.evolve_yield_surface();
        assert_relative_eq!(
            mat.yield_surface(),
            FY + expected_plastic * H_RATIO * E,
            max_relative = TOL
        );
    }

    #[test]
    fn test_elastic_range_after_commit_is_twice_yield_surface() {
        let mut mat = steel();
        mat.increment_strain(1.1 * yield_strain());
        mat.update_starting_state();
        let committed_stress = mat.stress();
        let elastic_range = 2.0 * committed_stress / E;

        // Reverse by just under the full range: still elastic.
        mat.increment_strain(-0.99 * elastic_range);
        assert!(mat.is_elastic());
        assert_relative_eq!(
            mat.stress(),
            committed_stress - 0.99 * elastic_range * E,
            max_relative = TOL
        );
        mat.update_starting_state();

        let mut within = mat.clone();
        within.increment_strain(-0.005 * elastic_range);
        assert!(within.is_elastic());

        mat.increment_strain(-0.02 * elastic_range);
        assert!(!mat.is_elastic());
    }

    #[test]
    fn test_cyclic_zero_strain_leaves_residual_stress() {
        let mut mat = steel();
        let applied = 1.1 * yield_strain();
        mat.increment_strain(applied);
        mat.update_starting_state();
        let plastic_strain = mat.plastic_strain();

        mat.increment_strain(-applied);
        assert!(mat.strain().abs() < 1e-15);
        assert!(mat.stress().abs() > 1.0);
        assert!(mat.plastic_strain() >= plastic_strain);
    }

    #[test]
    fn test_cyclic_zero_stress_leaves_residual_strain() {
        let mut mat = steel();
        mat.increment_strain(1.1 * yield_strain());
        mat.update_starting_state();
        let stress = mat.stress();

        mat.increment_strain(-stress / E);
        assert!(mat.stress().abs() < 1e-3);
        assert!(mat.strain() > 0.0);
    }

    #[test]
    fn test_unloading_keeps_plastic_strain() {
        let mut mat = steel();
        mat.increment_strain(1.1 * yield_strain());
        mat.update_starting_state();
        let plastic_strain = mat.plastic_strain();

        mat.increment_strain(-0.5 * yield_strain());
        assert_eq!(mat.plastic_strain(), plastic_strain);
    }

    #[test]
    fn test_temperature_increment_does_not_change_state() {
        let mut mat = steel();
        mat.increment_strain(0.5 * yield_strain());
        let before = *mat.current_state();
        mat.increment_temperature(100.0);
        assert_eq!(*mat.current_state(), before);
    }

    #[test]
    fn test_boxed_clone_is_independent() {
        let template: Box<dyn Material1D> = Box::new(steel());
        let mut copy = template.clone();
        copy.increment_strain(0.5 * yield_strain());
        assert_eq!(template.stress(), 0.0);
        assert!(copy.stress() > 0.0);
    }
}
