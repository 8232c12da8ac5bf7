//! A single section fibre

use crate::materials::Material1D;

/// A longitudinal sub-area of a cross-section carrying one uniaxial material
#[derive(Debug, Clone)]
pub struct Fibre {
    material: Box<dyn Material1D>,
    area: f64,
    y: f64,
    z: f64,
    force: f64,
}

impl Fibre {
    /// Create a fibre with its own copy of `material`
    pub fn new(material: &dyn Material1D, area: f64, y: f64) -> Self {
        Self::with_z(material, area, y, 0.0)
    }

    pub fn with_z(material: &dyn Material1D, area: f64, y: f64, z: f64) -> Self {
        Self {
            material: material.clone_box(),
            area,
            y,
            z,
            force: 0.0,
        }
    }

    pub(crate) fn increment_strain(&mut self, d_strain: f64) {
        self.material.increment_strain(d_strain);
        self.force = self.material.stress() * self.area;
    }

    pub(crate) fn commit(&mut self) {
        self.material.update_starting_state();
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// Axial force carried by the fibre, `stress * area`
    pub fn force(&self) -> f64 {
        self.force
    }

    pub fn material(&self) -> &dyn Material1D {
        self.material.as_ref()
    }
}
