use nalgebra::{Matrix3, Quaternion, UnitQuaternion};

/// Rotation matrix taking inertial vectors into the body frame described by
/// the scalar-first body-to-inertial quaternion `q`.
pub fn inertial_to_body(q: Quaternion<f64>) -> Matrix3<f64> {
    UnitQuaternion::from_quaternion(q)
        .to_rotation_matrix()
        .into_inner()
        .transpose()
}

/// Converts a direction cosine matrix into a normalized quaternion.
///
/// Takes the scalar branch whenever the trace is positive and otherwise
/// branches on the largest diagonal element. The input is not required to be
/// orthonormal; the result is renormalized.
pub fn dcm_to_quaternion(m: &Matrix3<f64>) -> Quaternion<f64> {
    let trace = m.trace();
    let q = if trace > 0.0 {
        let s = 2.0 * (1.0 + trace).sqrt();
        Quaternion::new(
            0.25 * s,
            (m[(2, 1)] - m[(1, 2)]) / s,
            (m[(0, 2)] - m[(2, 0)]) / s,
            (m[(1, 0)] - m[(0, 1)]) / s,
        )
    } else if m[(0, 0)] > m[(1, 1)] && m[(0, 0)] > m[(2, 2)] {
        let s = 2.0 * (1.0 + m[(0, 0)] - m[(1, 1)] - m[(2, 2)]).sqrt();
        Quaternion::new(
            (m[(2, 1)] - m[(1, 2)]) / s,
            0.25 * s,
            (m[(0, 1)] + m[(1, 0)]) / s,
            (m[(0, 2)] + m[(2, 0)]) / s,
        )
    } else if m[(1, 1)] > m[(2, 2)] {
        let s = 2.0 * (1.0 + m[(1, 1)] - m[(0, 0)] - m[(2, 2)]).sqrt();
        Quaternion::new(
            (m[(0, 2)] - m[(2, 0)]) / s,
            (m[(0, 1)] + m[(1, 0)]) / s,
            0.25 * s,
            (m[(1, 2)] + m[(2, 1)]) / s,
        )
    } else {
        let s = 2.0 * (1.0 + m[(2, 2)] - m[(0, 0)] - m[(1, 1)]).sqrt();
        Quaternion::new(
            (m[(1, 0)] - m[(0, 1)]) / s,
            (m[(0, 2)] + m[(2, 0)]) / s,
            (m[(1, 2)] + m[(2, 1)]) / s,
            0.25 * s,
        )
    };
    let q = q.normalize();
    // keep the scalar part non-negative so equal rotations compare equal
    if q.w < 0.0 { -q } else { q }
}
