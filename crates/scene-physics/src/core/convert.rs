// Conversion helpers: glam <-> nalgebra.

use glam::{Mat4, Quat, Vec3};
use rapier3d::prelude::*;

pub(crate) fn vec3_to_na(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

pub(crate) fn na_to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn vec3_to_point(v: Vec3) -> Point<Real> {
    point![v.x, v.y, v.z]
}

pub(crate) fn point_to_vec3(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub(crate) fn quat_to_na(q: Quat) -> nalgebra::UnitQuaternion<Real> {
    nalgebra::UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z))
}

pub(crate) fn na_to_quat(q: &nalgebra::UnitQuaternion<Real>) -> Quat {
    let c = q.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

/// Unit direction for joint axes. Degenerate input falls back to +X.
pub(crate) fn vec3_to_unit(v: Vec3) -> UnitVector<Real> {
    let dir = v.try_normalize().unwrap_or(Vec3::X);
    nalgebra::Unit::new_unchecked(vec3_to_na(dir))
}

pub(crate) fn iso_from_parts(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    Isometry::from_parts(
        nalgebra::Translation3::new(translation.x, translation.y, translation.z),
        quat_to_na(rotation),
    )
}

pub(crate) fn iso_to_parts(iso: &Isometry<Real>) -> (Vec3, Quat) {
    (na_to_vec3(&iso.translation.vector), na_to_quat(&iso.rotation))
}

/// Rigid part of a matrix. Scale is dropped; bodies cannot carry it.
pub(crate) fn iso_from_matrix(m: &Mat4) -> Isometry<Real> {
    let (_scale, rotation, translation) = m.to_scale_rotation_translation();
    iso_from_parts(translation, rotation.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quaternion_round_trip_keeps_component_order() {
        let q = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.3);
        let back = na_to_quat(&quat_to_na(q));
        assert!(back.abs_diff_eq(q, 1e-6), "{:?} vs {:?}", back, q);
    }

    #[test]
    fn matrix_to_isometry_drops_scale() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::from_rotation_z(1.0),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let (t, r) = iso_to_parts(&iso_from_matrix(&m));
        assert!((t - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!(r.abs_diff_eq(Quat::from_rotation_z(1.0), 1e-5));
    }

    #[test]
    fn zero_axis_falls_back_to_x() {
        let axis = vec3_to_unit(Vec3::ZERO);
        assert!((axis.x - 1.0).abs() < 1e-6);
    }
}
