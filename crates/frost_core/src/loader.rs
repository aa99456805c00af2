//! Scene loading: turn a list of geometry files into one [`Model`].
//!
//! Lists where every file has the same type go through that format's batch
//! loader in one call. Mixed lists are loaded file by file and stop at the
//! first failure, keeping whatever was merged before it.

use rayon::prelude::*;
use thiserror::Error;

use crate::format::{classify, normalize_separators, FileType};
use crate::model::Model;
use crate::obj::{self, MaterialTable};

/// Errors that can occur while loading scene geometry.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("no input files given")]
    EmptyInput,

    #[error("unknown file type: {path}")]
    UnknownFormat { path: String },

    #[error("{path} is a {file_type} file, not geometry")]
    NotGeometry { path: String, file_type: FileType },

    #[error("failed to load {path}: {message}")]
    Parse { path: String, message: String },
}

pub type LoadResult<T> = Result<T, LoadError>;

impl Model {
    /// Load one geometry file into the model.
    pub fn load_file(&mut self, path: &str) -> LoadResult<()> {
        self.load(&[path])
    }

    /// Load geometry files into the model, appending to what it already
    /// holds.
    ///
    /// On failure the model keeps everything merged before the failing file.
    pub fn load<S: AsRef<str>>(&mut self, paths: &[S]) -> LoadResult<()> {
        if paths.is_empty() {
            return Err(LoadError::EmptyInput);
        }

        let files: Vec<(String, FileType)> = paths
            .iter()
            .map(|p| {
                let path = normalize_separators(p.as_ref());
                let file_type = classify(&path);
                (path, file_type)
            })
            .collect();

        let first_type = files[0].1;
        if files.iter().all(|(_, t)| *t == first_type) {
            let paths: Vec<String> = files.into_iter().map(|(p, _)| p).collect();
            load_batch(self, &paths, first_type)
        } else {
            log::debug!("Mixed input types, loading {} files one at a time", files.len());
            for (path, file_type) in &files {
                load_batch(self, std::slice::from_ref(path), *file_type)?;
            }
            Ok(())
        }
    }
}

/// Load a list of geometry files into a fresh model.
pub fn load_model<S: AsRef<str>>(paths: &[S]) -> LoadResult<Model> {
    let mut model = Model::new();
    model.load(paths)?;
    Ok(model)
}

/// Dispatch a list of same-typed files to their format's loader.
fn load_batch(model: &mut Model, paths: &[String], file_type: FileType) -> LoadResult<()> {
    match file_type {
        FileType::Obj => load_obj_batch(model, paths),
        FileType::Unknown => Err(LoadError::UnknownFormat {
            path: paths[0].clone(),
        }),
        other => Err(LoadError::NotGeometry {
            path: paths[0].clone(),
            file_type: other,
        }),
    }
}

/// Parse all files in parallel, then merge them in input order up to the
/// first one that failed.
fn load_obj_batch(model: &mut Model, paths: &[String]) -> LoadResult<()> {
    let parsed: Vec<_> = paths.par_iter().map(|path| obj::parse_obj(path)).collect();

    let mut table = MaterialTable::new();
    for (path, result) in paths.iter().zip(parsed) {
        let file = result.map_err(|e| LoadError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        log::info!("Loaded {} ({} triangles)", path, file.triangle_count());
        obj::merge_obj(model, file, &mut table);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_rejected() {
        let paths: [&str; 0] = [];
        assert!(matches!(load_model(&paths), Err(LoadError::EmptyInput)));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let mut model = Model::new();
        let err = model.load(&["scene.ply"]).unwrap_err();
        assert!(matches!(err, LoadError::UnknownFormat { ref path } if path == "scene.ply"));
        assert!(model.is_empty());
    }

    #[test]
    fn test_image_is_not_geometry() {
        let err = load_model(&["textures\\wood.png"]).unwrap_err();
        match err {
            LoadError::NotGeometry { path, file_type } => {
                assert_eq!(path, "textures/wood.png");
                assert_eq!(file_type, FileType::Png);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_obj_reports_parse_error() {
        let err = load_model(&["/nonexistent/dir/missing.obj"]).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("missing.obj"));
    }
}
