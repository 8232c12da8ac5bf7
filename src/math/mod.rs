//! Mathematical utilities for element and global calculations

pub mod sparse;

use nalgebra::{DMatrix, DVector, Matrix2x3, Matrix3, SMatrix, SVector, Vector3};

pub use sparse::{clear_values, kahan_norm_squared, scatter_triplets, PatternBuilder};

pub type Mat = DMatrix<f64>;
pub type DVec = DVector<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;

/// 12x12 matrix for two-node element stiffness in global DoFs
pub type Mat12 = SMatrix<f64, 12, 12>;
/// 12-element vector for two-node element forces/displacements
pub type Vec12 = SVector<f64, 12>;
/// 3x12 map from global element displacements to local deformations
pub type Mat3x12 = SMatrix<f64, 3, 12>;
/// Strain-displacement matrix at one integration point
pub type Mat2x3 = Matrix2x3<f64>;

/// Transformation from global element displacements to the local
/// deformational displacements `[delta, theta_1, theta_2]` of an in-plane beam.
///
/// Global element displacements are ordered as the six DoFs of the first node
/// followed by the six of the second. The in-plane translations are DoFs 0 and
/// 2 and the in-plane rotation is DoF 5. `theta` is measured from the chord,
/// so the rigid chord rotation is removed from both end rotations.
pub fn beam_deformation_matrix(cos: f64, sin: f64, length: f64) -> Mat3x12 {
    let mut t = Mat3x12::zeros();

    t[(0, 0)] = -cos;
    t[(0, 2)] = -sin;
    t[(0, 6)] = cos;
    t[(0, 8)] = sin;

    for (row, rotation) in [(1, 5), (2, 11)] {
        t[(row, 0)] = -sin / length;
        t[(row, 2)] = cos / length;
        t[(row, 6)] = sin / length;
        t[(row, 8)] = -cos / length;
        t[(row, rotation)] = 1.0;
    }

    t
}
