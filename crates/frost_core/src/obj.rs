//! Wavefront OBJ parsing via `tobj`.

use std::collections::HashMap;

use frost_math::Vec3;

use crate::mesh::Mesh;
use crate::model::{Material, Model};
use crate::primitive::Primitive;

/// One parsed OBJ file, not yet merged into a model.
#[derive(Debug)]
pub(crate) struct ObjFile {
    pub path: String,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl ObjFile {
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }
}

/// Material name → model material index, shared by the files of one batch
/// so that a material defined by several files is stored once.
pub(crate) type MaterialTable = HashMap<String, u32>;

/// Parse a single OBJ file (and its MTL library, if any).
///
/// A missing or broken MTL library only produces a warning; faces then fall
/// back to the model's default material.
pub(crate) fn parse_obj(path: &str) -> Result<ObjFile, tobj::LoadError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )?;

    let materials = match materials {
        Ok(materials) => materials.into_iter().map(convert_material).collect(),
        Err(e) => {
            log::warn!("Ignoring materials of {}: {}", path, e);
            Vec::new()
        }
    };

    let meshes = models
        .into_iter()
        .map(|model| {
            let positions = model
                .mesh
                .positions
                .chunks_exact(3)
                .map(Vec3::from_slice)
                .collect();
            Mesh::new(model.name, positions, model.mesh.indices).with_material(model.mesh.material_id)
        })
        .collect();

    Ok(ObjFile {
        path: path.to_string(),
        meshes,
        materials,
    })
}

fn convert_material(m: tobj::Material) -> Material {
    let defaults = Material::default();
    let specular = m.specular.map(Vec3::from);
    Material {
        name: m.name,
        cd: m.diffuse.map(Vec3::from).unwrap_or(defaults.cd),
        kd: 1.0,
        cs: specular.unwrap_or(defaults.cs),
        ks: if specular.is_some() { 1.0 } else { defaults.ks },
        specular_exp: m.shininess.unwrap_or(defaults.specular_exp),
    }
}

/// Append the triangles of `file` to `model`. Returns the number of
/// primitives merged.
pub(crate) fn merge_obj(model: &mut Model, file: ObjFile, table: &mut MaterialTable) -> usize {
    let local_ids: Vec<u32> = file
        .materials
        .into_iter()
        .map(|material| match table.get(&material.name) {
            Some(&id) => id,
            None => {
                let name = material.name.clone();
                let id = model.add_material(material);
                table.insert(name, id);
                id
            }
        })
        .collect();

    let mut merged = 0;
    for mesh in &file.meshes {
        let material_id = match mesh.material.and_then(|i| local_ids.get(i).copied()) {
            Some(id) => id,
            None => model.default_material(),
        };

        let primitives = mesh
            .triangles()
            .into_iter()
            .map(|[a, b, c]| Primitive::triangle(a, b, c, material_id));
        merged += model.append(primitives);
    }

    log::debug!(
        "Merged {} ({} meshes, {} triangles)",
        file.path,
        file.meshes.len(),
        merged
    );
    merged
}
