//! Frost Core - scene model, file formats and image I/O.
//!
//! This crate provides:
//!
//! - **Format registry**: extension → [`FileType`] classification
//! - **Scene model**: [`Model`] with [`Primitive`]s and plastic [`Material`]s
//! - **Scene loading**: OBJ files via `tobj`, plus the built-in snowman scene
//! - **Image I/O**: PNG load/save through [`raster`]
//! - **Camera files**: eye/center/up text files
//!
//! # Example
//!
//! ```ignore
//! use frost_core::load_model;
//!
//! let model = load_model(&["teapot.obj", "floor.obj"])?;
//! println!("{} primitives, {} materials",
//!     model.primitives().len(),
//!     model.materials().len());
//! ```

pub mod camera_file;
pub mod format;
pub mod loader;
pub mod mesh;
pub mod model;
mod obj;
pub mod primitive;
pub mod raster;

// Re-export commonly used types
pub use camera_file::{read_camera_file, write_camera_file, CameraFileError, CameraPose};
pub use format::{classify, normalize_separators, FileType};
pub use loader::{load_model, LoadError};
pub use mesh::Mesh;
pub use model::{Material, Model};
pub use primitive::{Primitive, Shape, Sphere, SurfaceHit, Triangle};
pub use raster::{load_image, save_image, CodecError, PixelFormat, RasterImage, SaveOptions};
