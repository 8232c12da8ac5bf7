//! Uniaxial material models used by section fibres
//!
//! Every material follows the same two-state lifecycle: a *starting* state that
//! holds the last converged (committed) response, and a *current* state that is
//! rebuilt from the starting state on every strain increment. Iterations within
//! a load step can therefore be repeated any number of times without drifting.

mod elastic_plastic;

pub use elastic_plastic::{ElasticPlasticMaterial, MaterialState};

use std::fmt;

/// One-dimensional constitutive model.
///
/// Fibres own their material through `Box<dyn Material1D>`; use [`clone_box`]
/// (or `Clone` on the box) to hand each fibre an independent copy.
///
/// [`clone_box`]: Material1D::clone_box
pub trait Material1D: fmt::Debug + Send + Sync {
    /// Apply a strain increment measured from the last committed state.
    fn increment_strain(&mut self, d_strain: f64);

    /// Apply a temperature increment.
    fn increment_temperature(&mut self, _d_temperature: f64) {}

    /// Recompute the hardened yield surface from the committed plastic strain.
    fn evolve_yield_surface(&mut self);

    /// Commit the current state as the new starting state.
    fn update_starting_state(&mut self);

    fn stress(&self) -> f64;
    fn strain(&self) -> f64;
    fn youngs_modulus(&self) -> f64;
    fn tangent_modulus(&self) -> f64;
    fn yield_surface(&self) -> f64;
    fn plastic_strain(&self) -> f64;
    fn is_elastic(&self) -> bool;

    /// Deep copy into a new box.
    fn clone_box(&self) -> Box<dyn Material1D>;
}

impl Clone for Box<dyn Material1D> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
