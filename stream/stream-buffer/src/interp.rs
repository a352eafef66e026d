//! Rigid-transform interpolation: SLERP on rotation, linear on translation.

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

/// Extracts the rotation part of a 4x4 rigid transform as a unit quaternion.
#[must_use]
pub(crate) fn rotation_of(matrix: &Matrix4<f64>) -> UnitQuaternion<f64> {
    let rot: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rot))
}

/// Extracts the translation column of a 4x4 rigid transform.
#[must_use]
pub(crate) fn translation_of(matrix: &Matrix4<f64>) -> Vector3<f64> {
    matrix.fixed_view::<3, 1>(0, 3).into_owned()
}

/// Interpolates between two rigid transforms.
///
/// The rotation parts are blended with spherical linear interpolation and
/// the translation columns with a weighted sum; `weight_b = 0` yields `a`,
/// `weight_b = 1` yields `b`. Degenerate (near-antipodal) rotations fall
/// back to the `a` rotation rather than producing an arbitrary axis.
#[must_use]
pub fn interpolate_rigid(a: &Matrix4<f64>, b: &Matrix4<f64>, weight_b: f64) -> Matrix4<f64> {
    let qa = rotation_of(a);
    let qb = rotation_of(b);
    let rotation = qa.try_slerp(&qb, weight_b, 1e-9).unwrap_or(qa);

    let weight_a = 1.0 - weight_b;
    let translation = translation_of(a) * weight_a + translation_of(b) * weight_b;

    let mut out = Matrix4::identity();
    out.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(rotation.to_rotation_matrix().matrix());
    out.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    out
}

/// Geodesic angle between the rotation parts of two transforms, in degrees.
#[must_use]
pub fn orientation_difference_deg(a: &Matrix4<f64>, b: &Matrix4<f64>) -> f64 {
    rotation_of(a).angle_to(&rotation_of(b)).to_degrees()
}
