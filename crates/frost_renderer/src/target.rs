//! Accumulation render target.
//!
//! Holds the running float average per pixel alongside its 8-bit RGBA
//! rendition, which is what gets exported.

use bytemuck::{Pod, Zeroable};
use frost_math::Vec4;

/// Weights for blending a new frame into the running average:
/// `accum = sample * src + accum * dst`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blend {
    pub src: f32,
    pub dst: f32,
}

impl Blend {
    /// Weights that turn the first `frame - 1` samples into the mean of
    /// `frame` samples.
    pub fn for_frame(frame: u32) -> Self {
        let alpha = 1.0 / frame.max(1) as f32;
        Self {
            src: alpha,
            dst: 1.0 - alpha,
        }
    }
}

/// 8-bit RGBA pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    /// Quantize a linear color: `round(clamp(c, 0, 1) * 255)` per channel.
    pub fn from_color(c: Vec4) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: q(c.x),
            g: q(c.y),
            b: q(c.z),
            a: q(c.w),
        }
    }
}

/// Per-pixel running average of frame estimates.
#[derive(Debug, Clone, Default)]
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    accum: Vec<Vec4>,
    color: Vec<Rgba8>,
}

impl AccumulationBuffer {
    /// Create a buffer with every pixel zero.
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            accum: vec![Vec4::ZERO; len],
            color: vec![Rgba8::default(); len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.accum.is_empty()
    }

    /// Reallocate to the new size and zero all pixels.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    /// Accumulated color at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.accum[self.offset(x, y)]
    }

    /// Blend one sample into pixel `(x, y)`.
    pub fn blend_pixel(&mut self, x: u32, y: u32, sample: Vec4, blend: Blend) {
        let i = self.offset(x, y);
        let value = sample * blend.src + self.accum[i] * blend.dst;
        self.accum[i] = value;
        self.color[i] = Rgba8::from_color(value);
    }

    /// The quantized pixels as tightly packed RGBA bytes, row 0 first.
    pub fn as_rgba8(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color)
    }
}
