//! Elastic section properties for linear beam elements

use serde::{Deserialize, Serialize};

/// Elastic in-plane section: modulus, area and second moment of area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasicSection {
    /// Modulus of elasticity in Pa
    pub e: f64,
    /// Cross-sectional area in m²
    pub a: f64,
    /// Second moment of area about the bending axis in m⁴
    pub i: f64,
}

impl BasicSection {
    pub fn new(e: f64, a: f64, i: f64) -> Self {
        Self { e, a, i }
    }

    /// Solid rectangle bending about its `depth`
    pub fn rectangular(e: f64, width: f64, depth: f64) -> Self {
        Self {
            e,
            a: width * depth,
            i: width * depth.powi(3) / 12.0,
        }
    }

    /// Wide flange (I-beam) section bending about its strong axis
    pub fn wide_flange(
        e: f64,
        depth: f64,
        flange_width: f64,
        flange_thickness: f64,
        web_thickness: f64,
    ) -> Self {
        let bf = flange_width;
        let tf = flange_thickness;
        let tw = web_thickness;
        let hw = depth - 2.0 * tf;

        Self {
            e,
            a: 2.0 * bf * tf + hw * tw,
            i: (bf * depth.powi(3) - (bf - tw) * hw.powi(3)) / 12.0,
        }
    }

    /// Axial rigidity EA
    pub fn ea(&self) -> f64 {
        self.e * self.a
    }

    /// Flexural rigidity EI
    pub fn ei(&self) -> f64 {
        self.e * self.i
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangular_section() {
        let section = BasicSection::rectangular(2.06e11, 0.3, 0.5);
        assert_relative_eq!(section.a, 0.15);
        assert_relative_eq!(section.i, 0.3 * 0.5_f64.powi(3) / 12.0);
    }

    #[test]
    fn test_wide_flange_matches_parallel_axis() {
        let (d, b, tf, tw) = (467.2e-3, 192.8e-3, 19.6e-3, 11.4e-3);
        let section = BasicSection::wide_flange(2.06e11, d, b, tf, tw);
        let hw = d - 2.0 * tf;
        let parallel_axis = tw * hw.powi(3) / 12.0
            + 2.0 * b * tf.powi(3) / 12.0
            + 2.0 * b * tf * (0.5 * d - 0.5 * tf).powi(2);
        assert_relative_eq!(section.i, parallel_axis, max_relative = 1e-12);
    }
}
