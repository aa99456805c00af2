//! Unified scene model: primitives, materials and their bounds.

use frost_math::{Aabb, Vec3};

use crate::primitive::Primitive;

/// Plastic material: a Lambertian base plus a Phong specular lobe.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name (from the MTL file, empty for built-ins)
    pub name: String,

    /// Diffuse color
    pub cd: Vec3,

    /// Diffuse weight
    pub kd: f32,

    /// Specular color
    pub cs: Vec3,

    /// Specular weight
    pub ks: f32,

    /// Phong exponent
    pub specular_exp: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            cd: Vec3::splat(0.8),
            kd: 1.0,
            cs: Vec3::ZERO,
            ks: 0.0,
            specular_exp: 32.0,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>, cd: Vec3) -> Self {
        Self {
            name: name.into(),
            cd,
            ..Default::default()
        }
    }

    /// Diffuse albedo (`cd * kd`), used as the bounce weight.
    pub fn albedo(&self) -> Vec3 {
        self.cd * self.kd
    }
}

/// Geometry and materials for one render, merged from any number of sources.
///
/// Every primitive's `material_id` indexes `materials`; the only way to add
/// primitives is through [`Model::append`], which enforces that.
#[derive(Clone, Debug, Default)]
pub struct Model {
    primitives: Vec<Primitive>,
    materials: Vec<Material>,
    bbox: Option<Aabb>,
    default_material: Option<u32>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Bounds of every merged primitive, `None` while the model is empty.
    pub fn bbox(&self) -> Option<Aabb> {
        self.bbox
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Add a material and return its index.
    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    /// Index of the shared fallback material, created on first use.
    pub fn default_material(&mut self) -> u32 {
        match self.default_material {
            Some(id) => id,
            None => {
                let id = self.add_material(Material::new("default", Vec3::splat(0.8)));
                self.default_material = Some(id);
                id
            }
        }
    }

    /// Index of the first material called `name`, if any.
    pub fn find_material(&self, name: &str) -> Option<u32> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(|i| i as u32)
    }

    /// Merge primitives whose `material_id` already refers to this model's
    /// materials. Primitive ids are reassigned to their index in the model.
    ///
    /// Primitives with an out-of-range material id or with non-finite
    /// bounds are dropped with a warning, so the model bbox always encloses
    /// finite geometry. Returns the number of primitives merged.
    pub fn append(&mut self, primitives: impl IntoIterator<Item = Primitive>) -> usize {
        let material_count = self.materials.len() as u32;
        let mut merged = 0;

        for mut prim in primitives {
            if prim.material_id >= material_count {
                log::warn!(
                    "Dropping primitive with material id {} (model has {} materials)",
                    prim.material_id,
                    material_count
                );
                continue;
            }

            let bounds = prim.bounds();
            if !prim.is_finite() || !bounds.is_valid() {
                log::warn!("Dropping primitive with non-finite geometry {:?}", prim.shape);
                continue;
            }

            prim.prim_id = self.primitives.len() as u32;
            self.bbox = Some(match self.bbox {
                Some(b) => Aabb::surrounding(&b, &bounds),
                None => bounds,
            });
            self.primitives.push(prim);
            merged += 1;
        }

        merged
    }

    /// The built-in demo scene: three snowmen in a row.
    pub fn snowman() -> Self {
        let mut model = Model::new();

        let white = model.add_material(Material {
            name: "snow".into(),
            cd: Vec3::ONE,
            kd: 0.8,
            cs: Vec3::splat(0.3),
            ks: 0.2,
            specular_exp: 50.0,
        });
        let black = model.add_material(Material {
            name: "coal".into(),
            cd: Vec3::ZERO,
            kd: 1.0,
            cs: Vec3::ONE,
            ks: 0.1,
            specular_exp: 100.0,
        });

        const COUNT: usize = 3;
        const SPACING: f32 = 4.0;
        let start_x = -((COUNT - 1) as f32 * SPACING) / 2.0;

        let mut spheres = Vec::new();
        for i in 0..COUNT {
            let x = start_x + i as f32 * SPACING;

            // Body, stacked bottom to top
            for (y, radius) in [(1.0, 1.0), (2.25, 0.75), (3.25, 0.5)] {
                spheres.push(Primitive::sphere(Vec3::new(x, y, 0.0), radius, white));
            }

            // Eyes on the head
            for dx in [-0.15, 0.15] {
                spheres.push(Primitive::sphere(Vec3::new(x + dx, 3.4, 0.45), 0.05, black));
            }
        }

        model.append(spheres);
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_model_has_no_bbox() {
        let model = Model::new();
        assert!(model.bbox().is_none());
        assert!(model.is_empty());
    }

    #[test]
    fn test_append_assigns_ids_and_grows_bbox() {
        let mut model = Model::new();
        let mat = model.add_material(Material::default());

        let merged = model.append([
            Primitive::sphere(Vec3::ZERO, 1.0, mat),
            Primitive::sphere(Vec3::new(10.0, 0.0, 0.0), 1.0, mat),
        ]);
        assert_eq!(merged, 2);

        let ids: Vec<u32> = model.primitives().iter().map(|p| p.prim_id).collect();
        assert_eq!(ids, vec![0, 1]);

        let bbox = model.bbox().expect("bbox should be valid");
        assert_eq!(bbox.min(), Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(bbox.max(), Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_append_drops_invalid_material_ids() {
        let mut model = Model::new();
        model.add_material(Material::default());

        let merged = model.append([
            Primitive::sphere(Vec3::ZERO, 1.0, 0),
            Primitive::sphere(Vec3::ZERO, 1.0, 5),
        ]);
        assert_eq!(merged, 1);
        assert_eq!(model.primitives().len(), 1);
    }

    #[test]
    fn test_append_drops_non_finite_primitives() {
        let mut model = Model::new();
        model.add_material(Material::default());

        let merged = model.append([
            Primitive::sphere(Vec3::new(f32::NAN, 0.0, 0.0), 1.0, 0),
            Primitive::sphere(Vec3::ZERO, f32::INFINITY, 0),
            Primitive::triangle(Vec3::ZERO, Vec3::X, Vec3::new(0.0, f32::NAN, 0.0), 0),
            Primitive::sphere(Vec3::new(2.0, 0.0, 0.0), 1.0, 0),
        ]);
        assert_eq!(merged, 1);
        assert_eq!(model.primitives()[0].prim_id, 0);

        let bbox = model.bbox().unwrap();
        assert!(bbox.is_valid());
        assert_eq!(bbox.min(), Vec3::new(1.0, -1.0, -1.0));
    }

    #[test]
    fn test_default_material_is_shared() {
        let mut model = Model::new();
        let a = model.default_material();
        let b = model.default_material();
        assert_eq!(a, b);
        assert_eq!(model.materials().len(), 1);
        assert_eq!(model.find_material("default"), Some(a));
    }

    #[test]
    fn test_snowman_scene() {
        let model = Model::snowman();
        assert_eq!(model.primitives().len(), 15);
        assert_eq!(model.materials().len(), 2);

        for prim in model.primitives() {
            assert!((prim.material_id as usize) < model.materials().len());
        }

        let bbox = model.bbox().expect("bbox");
        // Outermost snowmen sit at x = -4 and x = 4 with base radius 1
        assert!((bbox.x.min + 5.0).abs() < 1e-4);
        assert!((bbox.x.max - 5.0).abs() < 1e-4);
        assert!(bbox.y.min.abs() < 1e-4);
        assert!((bbox.y.max - 3.75).abs() < 1e-4);
    }
}
