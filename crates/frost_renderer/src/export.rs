//! Framebuffer export.

use frost_core::raster::CodecResult;
use frost_core::{save_image, CodecError, PixelFormat, RasterImage, SaveOptions};

/// Turn a bottom-right-origin RGBA8 framebuffer into an upright RGB8 image.
///
/// Alpha is dropped and the image is rotated by 180°, so output pixel
/// `(x, y)` is source pixel `(w - 1 - x, h - 1 - y)`.
pub fn framebuffer_to_image(rgba8: &[u8], width: u32, height: u32) -> CodecResult<RasterImage> {
    let pixels = width as usize * height as usize;
    if rgba8.len() != pixels * 4 {
        return Err(CodecError::BufferSize {
            width,
            height,
            format: PixelFormat::Rgba8,
            expected: pixels * 4,
            actual: rgba8.len(),
        });
    }

    // Walking the source backwards is the 180° rotation
    let rgb: Vec<u8> = rgba8
        .chunks_exact(4)
        .rev()
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    RasterImage::new(width, height, PixelFormat::Rgb8, rgb)
}

/// Write the framebuffer to `path` as an upright RGB PNG.
pub fn export_png(rgba8: &[u8], width: u32, height: u32, path: &str) -> CodecResult<()> {
    let image = framebuffer_to_image(rgba8, width, height)?;
    save_image(path, &image, &SaveOptions::default())?;
    log::info!("Wrote {}x{} image to {}", width, height, path);
    Ok(())
}
