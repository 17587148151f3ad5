//! Math type aliases and helper functions.
//!
//! All scene math is `f32` and backed by nalgebra. Rotations are always
//! unit quaternions so that composing them never drifts off the unit sphere.

mod aabb;
mod transform;

pub use nalgebra;

pub use aabb::AxisAlignedBox;
pub use transform::{Transform, TransformSpace};

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 3x3 matrix (f32).
pub type Mat3 = nalgebra::Matrix3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Unit quaternion (f32).
pub type Quat = nalgebra::UnitQuaternion<f32>;

/// Tolerance used when deciding whether a scale axis has collapsed.
const DEGENERATE_SCALE: f32 = 1e-8;

/// Build a 4x4 TRS matrix from scale, rotation, and translation.
pub fn mat4_from_scale_rotation_translation(scale: Vec3, rotation: Quat, translation: Vec3) -> Mat4 {
    let m = rotation.to_rotation_matrix();
    let rm = m.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Build a translation-only 4x4 matrix.
pub fn mat4_from_translation(t: Vec3) -> Mat4 {
    Mat4::new_translation(&t)
}

/// Build a rotation-only 4x4 matrix.
pub fn mat4_from_rotation(q: Quat) -> Mat4 {
    q.to_homogeneous()
}

/// Build a scale-only 4x4 matrix.
pub fn mat4_from_scale(s: Vec3) -> Mat4 {
    Mat4::new_nonuniform_scaling(&s)
}

/// Decompose a 4x4 matrix into (scale, rotation, translation).
///
/// Shear is discarded. A mirrored basis (negative determinant) is reported
/// as a negative X scale. Collapsed axes yield an identity rotation.
pub fn to_scale_rotation_translation(m: &Mat4) -> (Vec3, Quat, Vec3) {
    let translation = Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    let col0 = Vec3::new(m[(0, 0)], m[(1, 0)], m[(2, 0)]);
    let col1 = Vec3::new(m[(0, 1)], m[(1, 1)], m[(2, 1)]);
    let col2 = Vec3::new(m[(0, 2)], m[(1, 2)], m[(2, 2)]);

    let mut sx = col0.norm();
    let sy = col1.norm();
    let sz = col2.norm();
    if col0.dot(&col1.cross(&col2)) < 0.0 {
        sx = -sx;
    }
    let scale = Vec3::new(sx, sy, sz);

    if sx.abs() < DEGENERATE_SCALE || sy < DEGENERATE_SCALE || sz < DEGENERATE_SCALE {
        return (scale, Quat::identity(), translation);
    }

    let rot_mat = Mat3::from_columns(&[col0 / sx, col1 / sy, col2 / sz]);
    let rotation = Quat::from_rotation_matrix(&nalgebra::Rotation3::from_matrix(&rot_mat));
    (scale, rotation, translation)
}

/// Transform a point (w = 1) by a 4x4 matrix.
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    m.transform_point(&nalgebra::Point3::from(*p)).coords
}

/// Create a quaternion from rotation around the X axis.
pub fn quat_from_rotation_x(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::x_axis(), angle)
}

/// Create a quaternion from rotation around the Y axis.
pub fn quat_from_rotation_y(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::y_axis(), angle)
}

/// Create a quaternion from rotation around the Z axis.
pub fn quat_from_rotation_z(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::z_axis(), angle)
}

/// Create a quaternion from an arbitrary axis and angle (radians).
///
/// A zero-length axis yields the identity rotation.
pub fn quat_from_axis_angle(axis: Vec3, angle: f32) -> Quat {
    match nalgebra::Unit::try_new(axis, DEGENERATE_SCALE) {
        Some(axis) => Quat::from_axis_angle(&axis, angle),
        None => Quat::identity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_trs_matrix() {
        let m = mat4_from_scale_rotation_translation(
            Vec3::new(1.0, 1.0, 1.0),
            Quat::identity(),
            Vec3::zeros(),
        );
        assert!((m - Mat4::identity()).norm() < 1e-6);
    }

    #[test]
    fn trs_matches_product_of_parts() {
        let s = Vec3::new(2.0, 3.0, 4.0);
        let r = quat_from_rotation_y(0.7);
        let t = Vec3::new(1.0, -2.0, 5.0);
        let expected = mat4_from_translation(t) * mat4_from_rotation(r) * mat4_from_scale(s);
        let m = mat4_from_scale_rotation_translation(s, r, t);
        assert!((m - expected).norm() < 1e-5);
    }

    #[test]
    fn decompose_roundtrip() {
        let s = Vec3::new(2.0, 0.5, 1.5);
        let r = quat_from_rotation_z(FRAC_PI_2);
        let t = Vec3::new(3.0, 4.0, 5.0);
        let m = mat4_from_scale_rotation_translation(s, r, t);
        let (s2, r2, t2) = to_scale_rotation_translation(&m);
        assert!((s - s2).norm() < 1e-5);
        assert!(r.angle_to(&r2) < 1e-4);
        assert!((t - t2).norm() < 1e-6);
    }

    #[test]
    fn decompose_mirrored_matrix() {
        let m = mat4_from_scale(Vec3::new(-1.0, 1.0, 1.0));
        let (s, r, _) = to_scale_rotation_translation(&m);
        assert!((s - Vec3::new(-1.0, 1.0, 1.0)).norm() < 1e-6);
        assert!(r.angle() < 1e-5);
    }

    #[test]
    fn decompose_collapsed_axis() {
        let m = mat4_from_scale(Vec3::new(1.0, 0.0, 1.0));
        let (s, r, _) = to_scale_rotation_translation(&m);
        assert_eq!(s.y, 0.0);
        assert_eq!(r, Quat::identity());
    }

    #[test]
    fn rotate_vector_around_z() {
        let q = quat_from_rotation_z(FRAC_PI_2);
        let v = q * Vec3::new(1.0, 0.0, 0.0);
        assert!((v - Vec3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn zero_axis_is_identity() {
        assert_eq!(quat_from_axis_angle(Vec3::zeros(), 1.0), Quat::identity());
    }

    #[test]
    fn point_transform() {
        let m = mat4_from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform_point(&m, &Vec3::zeros()), Vec3::new(1.0, 2.0, 3.0));
        let scaled = mat4_from_scale(Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(transform_point(&scaled, &Vec3::x()), Vec3::new(2.0, 0.0, 0.0));
    }
}
