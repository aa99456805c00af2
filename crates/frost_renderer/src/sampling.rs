//! Random sampling helpers shared by the camera and the path kernel.

use std::f32::consts::PI;

use frost_math::Vec3;
use rand::{Rng, RngCore};

/// Uniform float in `[0, 1)`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Random offset in the square `[-0.5, 0.5)²`, used for pixel jitter.
pub fn sample_square(rng: &mut dyn RngCore) -> (f32, f32) {
    (gen_f32(rng) - 0.5, gen_f32(rng) - 0.5)
}

/// Cosine-weighted direction in the hemisphere around `normal`.
///
/// The pdf is `cos(theta) / PI`, which cancels against the Lambert term, so
/// callers weight the bounce by albedo alone.
pub fn cosine_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let r1 = gen_f32(rng);
    let r2 = gen_f32(rng);
    let phi = 2.0 * PI * r1;
    let r = r2.sqrt();
    let local = Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - r2).max(0.0).sqrt());

    let (t, b) = orthonormal_basis(normal);
    (t * local.x + b * local.y + normal * local.z).normalize_or_zero()
}

/// Two unit vectors completing `n` to an orthonormal basis.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
    let t = helper.cross(n).normalize();
    let b = n.cross(t);
    (t, b)
}

/// Mirror `v` about the plane with normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}
