//! Geometric primitives stored in a [`Model`](crate::Model).
//!
//! Shapes form a closed enum so acceleration structures can keep them by
//! value in one contiguous array.

use std::f32::consts::PI;

use frost_math::{Aabb, Interval, Ray, Vec3};

/// Sphere given by center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Triangle stored as one vertex plus two edge vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub e1: Vec3,
    pub e2: Vec3,
}

impl Triangle {
    pub fn from_vertices(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            v0,
            e1: v1 - v0,
            e2: v2 - v0,
        }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v0 + self.e1, self.v0 + self.e2]
    }

    pub fn area(&self) -> f32 {
        0.5 * self.e1.cross(self.e2).length()
    }
}

/// The surface kinds a scene may contain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere(Sphere),
    Triangle(Triangle),
}

/// Parametric hit on a single shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Ray parameter of the intersection
    pub t: f32,
    /// Surface coordinates (barycentric for triangles, spherical for spheres)
    pub u: f32,
    pub v: f32,
}

/// A shape tagged with its id and the index of its material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub prim_id: u32,
    pub material_id: u32,
}

impl Primitive {
    pub fn sphere(center: Vec3, radius: f32, material_id: u32) -> Self {
        Self {
            shape: Shape::Sphere(Sphere {
                center,
                radius: radius.max(0.0),
            }),
            prim_id: 0,
            material_id,
        }
    }

    pub fn triangle(v0: Vec3, v1: Vec3, v2: Vec3, material_id: u32) -> Self {
        Self {
            shape: Shape::Triangle(Triangle::from_vertices(v0, v1, v2)),
            prim_id: 0,
            material_id,
        }
    }

    /// Bounding box of the shape, padded on flat axes.
    pub fn bounds(&self) -> Aabb {
        match &self.shape {
            Shape::Sphere(s) => {
                let r = Vec3::splat(s.radius);
                Aabb::from_points(s.center - r, s.center + r)
            }
            Shape::Triangle(t) => {
                let [a, b, c] = t.vertices();
                Aabb::from_points(a.min(b).min(c), a.max(b).max(c))
            }
        }
    }

    /// True when every coordinate defining the shape is finite.
    ///
    /// Checked separately from [`Primitive::bounds`], whose min/max folding
    /// can swallow a NaN corner.
    pub fn is_finite(&self) -> bool {
        match &self.shape {
            Shape::Sphere(s) => s.center.is_finite() && s.radius.is_finite(),
            Shape::Triangle(t) => t.v0.is_finite() && t.e1.is_finite() && t.e2.is_finite(),
        }
    }

    pub fn centroid(&self) -> Vec3 {
        self.bounds().centroid()
    }

    /// Closest intersection with `ray` strictly inside `ray_t`.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
        match &self.shape {
            Shape::Sphere(s) => intersect_sphere(s, ray, ray_t),
            Shape::Triangle(t) => intersect_triangle(t, ray, ray_t),
        }
    }

    /// Geometric outward normal at a point on the surface.
    pub fn normal_at(&self, p: Vec3) -> Vec3 {
        match &self.shape {
            Shape::Sphere(s) => ((p - s.center) / s.radius.max(f32::MIN_POSITIVE)).normalize_or_zero(),
            Shape::Triangle(t) => t.e1.cross(t.e2).normalize_or_zero(),
        }
    }

    /// Bounds of the part of the shape that lies inside the slab
    /// `slab` on `axis`, further restricted to `within`.
    ///
    /// Returns an empty box when nothing of the shape is inside.
    pub fn clip_bounds(&self, axis: usize, slab: Interval, within: &Aabb) -> Aabb {
        let clipped = match &self.shape {
            Shape::Sphere(_) => self.bounds().with_axis_interval(
                axis,
                Interval::intersection(&self.bounds().axis_interval(axis), &slab),
            ),
            Shape::Triangle(t) => {
                let polygon = t.vertices().to_vec();
                let polygon = clip_polygon(&polygon, axis, slab.min, true);
                let polygon = clip_polygon(&polygon, axis, slab.max, false);
                let mut bounds = Aabb::EMPTY;
                for p in polygon {
                    bounds.include_point(p);
                }
                bounds
            }
        };
        Aabb::intersection(&clipped, within)
    }
}

fn intersect_sphere(s: &Sphere, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
    let oc = s.center - ray.origin();
    let a = ray.direction().length_squared();
    let h = ray.direction().dot(oc);
    let c = oc.length_squared() - s.radius * s.radius;

    let discriminant = h * h - a * c;
    if discriminant < 0.0 || a == 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();

    // Nearest root in range
    let mut root = (h - sqrtd) / a;
    if !ray_t.surrounds(root) {
        root = (h + sqrtd) / a;
        if !ray_t.surrounds(root) {
            return None;
        }
    }

    let n = (ray.at(root) - s.center) / s.radius;
    let theta = (-n.y).clamp(-1.0, 1.0).acos();
    let phi = (-n.z).atan2(n.x) + PI;
    Some(SurfaceHit {
        t: root,
        u: phi / (2.0 * PI),
        v: theta / PI,
    })
}

/// Möller-Trumbore ray-triangle intersection.
fn intersect_triangle(tri: &Triangle, ray: &Ray, ray_t: Interval) -> Option<SurfaceHit> {
    let h = ray.direction().cross(tri.e2);
    let a = tri.e1.dot(h);

    // Parallel to the triangle plane
    if a.abs() < 1e-12 {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin() - tri.v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(tri.e1);
    let v = f * ray.direction().dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * tri.e2.dot(q);
    ray_t.surrounds(t).then_some(SurfaceHit { t, u, v })
}

/// One Sutherland-Hodgman pass: keep the part of a convex polygon on one
/// side of the plane `p[axis] == value`.
fn clip_polygon(points: &[Vec3], axis: usize, value: f32, keep_above: bool) -> Vec<Vec3> {
    let inside = |p: &Vec3| if keep_above { p[axis] >= value } else { p[axis] <= value };
    let mut out = Vec::with_capacity(points.len() + 1);

    for (i, current) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        match (inside(current), inside(next)) {
            (true, true) => out.push(*next),
            (true, false) => out.push(plane_crossing(current, next, axis, value)),
            (false, true) => {
                out.push(plane_crossing(current, next, axis, value));
                out.push(*next);
            }
            (false, false) => {}
        }
    }
    out
}

fn plane_crossing(a: &Vec3, b: &Vec3, axis: usize, value: f32) -> Vec3 {
    let denom = b[axis] - a[axis];
    let t = if denom.abs() > 0.0 { (value - a[axis]) / denom } else { 0.0 };
    let mut p = a.lerp(*b, t.clamp(0.0, 1.0));
    p[axis] = value;
    p
}
