//! Raster image I/O.
//!
//! Picks a codec from the filename via the format registry and hands the
//! bytes to it. Only PNG is registered; every other extension is rejected
//! in both directions rather than falling back to a default format.

use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, ImageFormat};
use thiserror::Error;

use crate::format::{classify, normalize_separators, FileType};

/// Errors that can occur while reading or writing images.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported image format: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("pixel buffer holds {actual} bytes, {width}x{height} {format:?} needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Channel layout of an 8-bit raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Luma8,
    LumaA8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Luma8 => 1,
            PixelFormat::LumaA8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    fn color_type(self) -> ColorType {
        match self {
            PixelFormat::Luma8 => ColorType::L8,
            PixelFormat::LumaA8 => ColorType::La8,
            PixelFormat::Rgb8 => ColorType::Rgb8,
            PixelFormat::Rgba8 => ColorType::Rgba8,
        }
    }
}

/// Tightly packed, row-major 8-bit image with the first row on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RasterImage {
    /// Wrap a pixel buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> CodecResult<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(CodecError::BufferSize {
                width,
                height,
                format,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Bytes of pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let channels = self.format.channels();
        let start = (y as usize * self.width as usize + x as usize) * channels;
        &self.data[start..start + channels]
    }
}

/// PNG compression effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Fast,
    #[default]
    Default,
    Best,
}

/// Options passed to the encoder when saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    pub compression: Compression,
}

/// Decode PNG bytes into an 8-bit raster.
///
/// 8-bit gray, gray-alpha, RGB and RGBA keep their layout; anything else
/// (16-bit, palette expansions) is converted to RGBA8.
pub fn decode(bytes: &[u8]) -> CodecResult<RasterImage> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
    let (width, height) = (img.width(), img.height());

    let (format, data) = match img.color() {
        ColorType::L8 => (PixelFormat::Luma8, img.into_luma8().into_raw()),
        ColorType::La8 => (PixelFormat::LumaA8, img.into_luma_alpha8().into_raw()),
        ColorType::Rgb8 => (PixelFormat::Rgb8, img.into_rgb8().into_raw()),
        _ => (PixelFormat::Rgba8, img.into_rgba8().into_raw()),
    };
    RasterImage::new(width, height, format, data)
}

/// Encode a raster as PNG bytes.
pub fn encode(image: &RasterImage, options: &SaveOptions) -> CodecResult<Vec<u8>> {
    let compression = match options.compression {
        Compression::Fast => CompressionType::Fast,
        Compression::Default => CompressionType::Default,
        Compression::Best => CompressionType::Best,
    };

    let mut bytes = Vec::new();
    let encoder = PngEncoder::new_with_quality(Cursor::new(&mut bytes), compression, FilterType::Adaptive);
    encoder.write_image(&image.data, image.width, image.height, image.format.color_type())?;
    Ok(bytes)
}

/// Load an image file, choosing the codec from its extension.
pub fn load_image(path: &str) -> CodecResult<RasterImage> {
    let path = image_path(path)?;
    let bytes = std::fs::read(&path).map_err(|source| CodecError::Io {
        path: path.clone(),
        source,
    })?;
    let image = decode(&bytes)?;
    log::debug!("Loaded image {} ({}x{} {:?})", path, image.width, image.height, image.format);
    Ok(image)
}

/// Save an image file, choosing the codec from its extension.
pub fn save_image(path: &str, image: &RasterImage, options: &SaveOptions) -> CodecResult<()> {
    let path = image_path(path)?;
    let bytes = encode(image, options)?;
    std::fs::write(&path, bytes).map_err(|source| CodecError::Io {
        path: path.clone(),
        source,
    })?;
    log::debug!("Saved image {} ({}x{} {:?})", path, image.width, image.height, image.format);
    Ok(())
}

/// Normalize the path and make sure it names a registered image type.
fn image_path(path: &str) -> CodecResult<String> {
    let path = normalize_separators(path);
    match classify(&path) {
        FileType::Png => Ok(path),
        _ => Err(CodecError::UnsupportedFormat { path }),
    }
}
