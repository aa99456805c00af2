//! Indexed triangle mesh, the intermediate form between a file parser and
//! the flat primitive list of a [`Model`](crate::Model).

use frost_math::Vec3;

use crate::primitive::Triangle;

/// Vertex positions plus triangle indices, all sharing one material slot.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Object or group name from the source file
    pub name: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Index into the source file's material list, if the mesh has one
    pub material: Option<usize>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            positions,
            indices,
            material: None,
        }
    }

    pub fn with_material(mut self, material: Option<usize>) -> Self {
        self.material = material;
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangle corner positions, skipping faces with out-of-range indices
    /// and faces whose area is zero or not finite.
    pub fn triangles(&self) -> Vec<[Vec3; 3]> {
        let mut triangles = Vec::with_capacity(self.triangle_count());
        let mut skipped = 0usize;

        for chunk in self.indices.chunks_exact(3) {
            let corners = [chunk[0], chunk[1], chunk[2]].map(|i| self.positions.get(i as usize));
            let [Some(a), Some(b), Some(c)] = corners else {
                log::warn!(
                    "Invalid triangle indices {:?} in '{}' ({} vertices)",
                    chunk,
                    self.name,
                    self.positions.len()
                );
                continue;
            };

            let area = Triangle::from_vertices(*a, *b, *c).area();
            if !(area.is_finite() && area > 0.0) {
                skipped += 1;
                continue;
            }
            triangles.push([*a, *b, *c]);
        }

        if skipped > 0 {
            log::warn!("Skipped {} degenerate triangles in '{}'", skipped, self.name);
        }
        triangles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangles_skip_non_finite_faces() {
        let positions = vec![
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, f32::INFINITY, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        let mesh = Mesh::new("bad", positions.clone(), vec![0, 1, 2, 1, 3, 2, 1, 4, 2]);
        assert_eq!(mesh.triangle_count(), 3);

        let triangles = mesh.triangles();
        assert_eq!(triangles, vec![[positions[1], positions[4], positions[2]]]);
    }

    #[test]
    fn test_triangles_skip_bad_faces() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        // Valid, out of range, degenerate, valid
        let indices = vec![0, 1, 2, 0, 1, 9, 0, 0, 1, 1, 3, 2];

        let mesh = Mesh::new("quad", positions.clone(), indices);
        let triangles = mesh.triangles();

        assert_eq!(triangles.len(), 2);
        assert_eq!(triangles[0], [positions[0], positions[1], positions[2]]);
        assert_eq!(triangles[1], [positions[1], positions[3], positions[2]]);
    }
}
