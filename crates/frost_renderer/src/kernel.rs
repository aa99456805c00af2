//! Path tracing kernel.
//!
//! Estimates the color seen along one primary ray with next event
//! estimation from point lights and cosine-weighted diffuse bounces.

use frost_core::Material;
use frost_math::{Interval, Ray, Vec3, Vec4};
use rand::RngCore;

use crate::bvh::Bvh;
use crate::light::PointLight;
use crate::material::{Color, Plastic};
use crate::sampling::cosine_hemisphere;
use crate::target::Blend;

/// Everything a frame needs to trace the scene.
#[derive(Debug, Clone)]
pub struct KernelParams<'a, 'p> {
    pub bvh: &'a Bvh<'p>,
    pub materials: &'a [Material],
    pub lights: Vec<PointLight>,
    /// Maximum path segments per sample
    pub bounces: u32,
    /// Offset along the normal for secondary ray origins
    pub epsilon: f32,
    /// Returned by primary rays that miss; secondary misses add its RGB
    pub background: Vec4,
    pub blend: Blend,
}

/// Per-frame tracer built from [`KernelParams`].
pub struct PathKernel<'k, 'a, 'p> {
    params: &'k KernelParams<'a, 'p>,
    shading: Vec<Plastic>,
}

impl<'k, 'a, 'p> PathKernel<'k, 'a, 'p> {
    pub fn new(params: &'k KernelParams<'a, 'p>) -> Self {
        Self {
            params,
            shading: params.materials.iter().map(Plastic::from).collect(),
        }
    }

    fn plastic(&self, material_id: u32) -> Plastic {
        self.shading
            .get(material_id as usize)
            .copied()
            .unwrap_or_default()
    }

    /// One sample of the color along `ray`. Non-finite channels come back
    /// as zero.
    pub fn trace(&self, ray: &Ray, rng: &mut dyn RngCore) -> Vec4 {
        sanitize(self.radiance(ray, rng))
    }

    fn radiance(&self, primary: &Ray, rng: &mut dyn RngCore) -> Vec4 {
        let params = self.params;
        let background = params.background;
        let prims = params.bvh.primitives();

        let mut ray = *primary;
        let mut throughput = Color::ONE;
        let mut result = Color::ZERO;

        for depth in 0..params.bounces {
            let hit = match params
                .bvh
                .closest_hit(&ray, Interval::new(0.0, f32::INFINITY))
            {
                Some(hit) => hit,
                None if depth == 0 => return background,
                None => {
                    result += throughput * background.truncate();
                    break;
                }
            };

            let prim = &prims[hit.prim_index as usize];
            let p = ray.at(hit.t);
            let wo = -ray.direction().normalize();

            // Shade the side facing the incoming ray
            let mut n = prim.normal_at(p);
            if n.dot(wo) < 0.0 {
                n = -n;
            }
            let origin = p + n * params.epsilon;
            let plastic = self.plastic(prim.material_id);

            for light in &params.lights {
                result += throughput * self.direct_light(light, &plastic, origin, n, wo);
            }

            if depth + 1 == params.bounces {
                break;
            }

            throughput *= plastic.albedo();
            if throughput.max_element() <= 0.0 {
                break;
            }
            ray = Ray::new(origin, cosine_hemisphere(n, rng));
        }

        result.extend(1.0)
    }

    /// Unshadowed contribution of `light` at `origin`, zero when occluded.
    fn direct_light(
        &self,
        light: &PointLight,
        plastic: &Plastic,
        origin: Vec3,
        n: Vec3,
        wo: Vec3,
    ) -> Color {
        let Some(sample) = light.sample(origin) else {
            return Color::ZERO;
        };

        let cos_theta = n.dot(sample.direction);
        if cos_theta <= 0.0 {
            return Color::ZERO;
        }

        let shadow = Ray::new(origin, sample.direction);
        let shadow_t = Interval::new(0.0, sample.distance - self.params.epsilon);
        if self.params.bvh.any_hit(&shadow, shadow_t) {
            return Color::ZERO;
        }

        plastic.eval(n, sample.direction, wo) * sample.radiance * cos_theta
    }
}

/// Replace NaN and infinite channels with zero.
fn sanitize(c: Vec4) -> Vec4 {
    let fix = |v: f32| if v.is_finite() { v } else { 0.0 };
    Vec4::new(fix(c.x), fix(c.y), fix(c.z), fix(c.w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{build, BuildStrategy};
    use frost_core::Primitive;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::PI;

    fn params<'a, 'p>(bvh: &'a Bvh<'p>, materials: &'a [Material]) -> KernelParams<'a, 'p> {
        KernelParams {
            bvh,
            materials,
            lights: vec![PointLight::head_light(Vec3::new(0.0, 0.0, 5.0), PI)],
            bounces: 1,
            epsilon: 1e-3,
            background: Vec4::new(0.1, 0.2, 0.3, 1.0),
            blend: Blend::for_frame(1),
        }
    }

    #[test]
    fn test_miss_returns_background() {
        let prims = vec![Primitive::sphere(Vec3::new(0.0, 0.0, -10.0), 1.0, 0)];
        let materials = vec![Material::default()];
        let bvh = build(BuildStrategy::Binned, &prims).unwrap();
        let params = params(&bvh, &materials);
        let kernel = PathKernel::new(&params);

        let mut rng = StdRng::seed_from_u64(0);
        let c = kernel.trace(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Y), &mut rng);
        assert_eq!(c, params.background);
    }

    #[test]
    fn test_head_on_diffuse_hit() {
        // Light at the eye, facing a white Lambertian sphere: L = albedo/PI * PI * cos(0)
        let prims = vec![Primitive::sphere(Vec3::ZERO, 1.0, 0)];
        let materials = vec![Material::new("white", Vec3::ONE)];
        let bvh = build(BuildStrategy::Binned, &prims).unwrap();
        let params = params(&bvh, &materials);
        let kernel = PathKernel::new(&params);

        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let c = kernel.trace(&ray, &mut rng);
        assert!((c.x - 1.0).abs() < 1e-3, "got {c:?}");
        assert_eq!(c.w, 1.0);
    }

    #[test]
    fn test_occluded_light_gives_black() {
        // Small sphere between the light and the big one, ray hits the big one from the side
        let prims = vec![
            Primitive::sphere(Vec3::ZERO, 1.0, 0),
            Primitive::sphere(Vec3::new(0.0, 0.0, 3.0), 0.5, 0),
        ];
        let materials = vec![Material::new("white", Vec3::ONE)];
        let bvh = build(BuildStrategy::Binned, &prims).unwrap();
        let params = params(&bvh, &materials);
        let kernel = PathKernel::new(&params);

        let mut rng = StdRng::seed_from_u64(0);
        let ray = Ray::new(Vec3::new(0.2, 0.0, 1.8), Vec3::new(0.0, 0.0, -1.0));
        let c = kernel.trace(&ray, &mut rng);
        assert_eq!(c.truncate(), Vec3::ZERO);
    }

    #[test]
    fn test_sanitize() {
        let c = sanitize(Vec4::new(f32::NAN, 1.0, f32::INFINITY, 0.5));
        assert_eq!(c, Vec4::new(0.0, 1.0, 0.0, 0.5));
    }
}
