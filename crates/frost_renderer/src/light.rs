//! Point lights.

use frost_math::Vec3;

use crate::material::Color;

/// Point light with polynomial distance falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    /// Emitted color scaled by intensity
    pub color: Color,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
}

/// Direction, distance and arriving radiance from a light to a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Unit vector from the shaded point towards the light
    pub direction: Vec3,
    pub distance: f32,
    pub radiance: Color,
}

impl PointLight {
    pub fn new(position: Vec3, color: Color) -> Self {
        Self {
            position,
            color,
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
        }
    }

    /// White light riding on the camera eye, without falloff.
    pub fn head_light(eye: Vec3, intensity: f32) -> Self {
        Self::new(eye, Color::splat(intensity))
    }

    /// Falloff factor at `distance`.
    pub fn attenuation(&self, distance: f32) -> f32 {
        let denom = self.constant_attenuation
            + self.linear_attenuation * distance
            + self.quadratic_attenuation * distance * distance;
        if denom > 0.0 {
            1.0 / denom
        } else {
            0.0
        }
    }

    /// Light arriving at `p`, or `None` when `p` sits on the light.
    pub fn sample(&self, p: Vec3) -> Option<LightSample> {
        let to_light = self.position - p;
        let distance = to_light.length();
        if distance <= f32::EPSILON {
            return None;
        }
        Some(LightSample {
            direction: to_light / distance,
            distance,
            radiance: self.color * self.attenuation(distance),
        })
    }
}
