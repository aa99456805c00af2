//! Plastic surface shading.
//!
//! A plastic surface is a Lambertian base plus a normalized Phong lobe:
//!
//! ```text
//! f(wi, wo) = cd * kd / PI  +  cs * ks * (n + 2) / (2 PI) * max(0, r . wo)^n
//! ```
//!
//! where `r` is `wi` mirrored about the surface normal.

use std::f32::consts::PI;

use frost_core::Material;
use frost_math::Vec3;

use crate::sampling::reflect;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Shading form of a [`Material`], with the weights folded into the colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plastic {
    diffuse: Color,
    specular: Color,
    exponent: f32,
}

impl Plastic {
    pub fn new(diffuse: Color, specular: Color, exponent: f32) -> Self {
        Self {
            diffuse,
            specular,
            exponent: exponent.max(0.0),
        }
    }

    /// Reflectance used for diffuse bounces.
    pub fn albedo(&self) -> Color {
        self.diffuse
    }

    /// BRDF value for light arriving from `wi` and leaving towards `wo`.
    ///
    /// Both directions point away from the surface; `n` is the shading
    /// normal on the same side as `wo`.
    pub fn eval(&self, n: Vec3, wi: Vec3, wo: Vec3) -> Color {
        let diffuse = self.diffuse / PI;

        if self.specular == Color::ZERO {
            return diffuse;
        }

        let r = reflect(-wi, n);
        let cos_alpha = r.dot(wo).max(0.0);
        let norm = (self.exponent + 2.0) / (2.0 * PI);
        diffuse + self.specular * norm * cos_alpha.powf(self.exponent)
    }
}

impl Default for Plastic {
    fn default() -> Self {
        Self::from(&Material::default())
    }
}

impl From<&Material> for Plastic {
    fn from(m: &Material) -> Self {
        Plastic::new(m.cd * m.kd, m.cs * m.ks, m.specular_exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_diffuse_is_constant() {
        let plastic = Plastic::new(Color::splat(0.5), Color::ZERO, 10.0);
        let n = Vec3::Y;
        let a = plastic.eval(n, Vec3::Y, Vec3::new(1.0, 1.0, 0.0).normalize());
        let b = plastic.eval(n, Vec3::new(0.0, 1.0, 1.0).normalize(), Vec3::Y);
        assert!((a - Color::splat(0.5 / PI)).length() < 1e-6);
        assert_eq!(a, b);
    }

    #[test]
    fn test_specular_peaks_in_mirror_direction() {
        let plastic = Plastic::new(Color::ZERO, Color::ONE, 50.0);
        let n = Vec3::Y;
        let wi = Vec3::new(1.0, 1.0, 0.0).normalize();
        let mirror = Vec3::new(-1.0, 1.0, 0.0).normalize();
        let off = Vec3::new(-0.2, 1.0, 0.0).normalize();

        let peak = plastic.eval(n, wi, mirror);
        assert!((peak.x - 52.0 / (2.0 * PI)).abs() < 1e-3);
        assert!(plastic.eval(n, wi, off).x < peak.x * 0.1);
    }

    #[test]
    fn test_from_material_folds_weights() {
        let mut m = Material::new("red", Vec3::new(1.0, 0.0, 0.0));
        m.kd = 0.5;
        m.cs = Vec3::ONE;
        m.ks = 0.25;
        let plastic = Plastic::from(&m);
        assert_eq!(plastic.albedo(), Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(plastic.specular, Vec3::splat(0.25));
    }
}
