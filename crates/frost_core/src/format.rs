//! File format registry.
//!
//! Maps a filename extension to the kind of content Frost can read or write.
//! The table is closed: anything not listed is [`FileType::Unknown`].

use std::path::Path;

/// Content type derived from a filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// PNG raster image
    Png,
    /// Wavefront OBJ triangle mesh
    Obj,
    /// Extension missing or not in the table
    Unknown,
}

impl FileType {
    /// True for types the scene loader can turn into primitives.
    pub fn is_geometry(self) -> bool {
        matches!(self, FileType::Obj)
    }

    /// True for types the image codec dispatcher can read and write.
    pub fn is_image(self) -> bool {
        matches!(self, FileType::Png)
    }

    /// Short lowercase name used in log and error messages.
    pub fn name(self) -> &'static str {
        match self {
            FileType::Png => "png",
            FileType::Obj => "obj",
            FileType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Extension table. Matching is case-sensitive, so both conventional
/// spellings are listed explicitly.
const EXTENSIONS: &[(&str, FileType)] = &[
    ("png", FileType::Png),
    ("PNG", FileType::Png),
    ("obj", FileType::Obj),
    ("OBJ", FileType::Obj),
];

/// Replace Windows-style `\` separators with `/`.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Classify a filename by its extension.
///
/// Separators are normalized first, so `C:\scenes\teapot.obj` and
/// `C:/scenes/teapot.obj` classify the same way.
pub fn classify(filename: &str) -> FileType {
    let normalized = normalize_separators(filename);
    let Some(extension) = Path::new(&normalized).extension().and_then(|e| e.to_str()) else {
        return FileType::Unknown;
    };

    EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, ty)| *ty)
        .unwrap_or(FileType::Unknown)
}
