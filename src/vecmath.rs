use glam::{Mat4, Vec3, Vec4};

use crate::math::sqr;

/// Rotation by `angle` degrees around `axis`, `None` for a zero axis.
pub fn rotate(angle: f32, axis: Vec3) -> Option<Mat4> {
    let axis = axis.try_normalize()?;
    Some(Mat4::from_axis_angle(axis, angle.to_radians()))
}

/// World-to-camera transform of a camera at `eye` looking at `look`.
///
/// Follows pbrt's left-handed convention: the camera looks down its +z axis.
/// Returns `None` when the view direction is zero or parallel to `up`.
pub fn look_at(eye: Vec3, look: Vec3, up: Vec3) -> Option<Mat4> {
    let z = (eye - look).try_normalize()?;
    let x = up.cross(z).try_normalize()?;
    let y = z.cross(x);

    let frame = Mat4::from_cols(
        (-x).extend(0.),
        y.extend(0.),
        (-z).extend(0.),
        eye.extend(1.),
    );

    Some(frame.inverse())
}

/// Fresnel reflectance of a conductor, evaluated per channel.
///
/// Taken from PBRTv3 - FrConductor.
pub fn fresnel_conductor(cos_theta_i: f32, eta: Vec3, k: Vec3) -> Vec3 {
    let fr = |eta: f32, k: f32| {
        let cos2 = sqr(cos_theta_i);
        let sin2 = 1. - cos2;
        let eta2 = sqr(eta);
        let k2 = sqr(k);

        let t0 = eta2 - k2 - sin2;
        let a2_plus_b2 = f32::sqrt(sqr(t0) + 4. * eta2 * k2);
        let t1 = a2_plus_b2 + cos2;
        let a = f32::sqrt(f32::max(0.5 * (a2_plus_b2 + t0), 0.));
        let t2 = 2. * cos_theta_i * a;
        let rs = (t1 - t2) / (t1 + t2);

        let t3 = cos2 * a2_plus_b2 + sqr(sin2);
        let t4 = t2 * sin2;
        let rp = rs * (t3 - t4) / (t3 + t4);

        0.5 * (rp + rs)
    };

    Vec3::new(fr(eta.x, k.x), fr(eta.y, k.y), fr(eta.z, k.z))
}

// TODO: calculate epsilon automatically
pub fn vec4_cmp_assert(a: Vec4, b: Vec4) {
    assert!(a.abs_diff_eq(b, 0.0001), "{a} != {b}");
}

pub fn vec3_cmp_assert(a: Vec3, b: Vec3) {
    assert!(a.abs_diff_eq(b, 0.0001), "{a} != {b}");
}

pub fn mat4_cmp_assert(a: Mat4, b: Mat4) {
    assert!(a.abs_diff_eq(b, 0.0001), "{a} != {b}");
}
