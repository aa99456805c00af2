//! Tile-based frame scheduling.
//!
//! Divides the image into tiles that are traced independently and in
//! parallel on a dedicated rayon pool. Every tile of a frame is finished
//! before any of them is blended into the target, so a frame either lands
//! completely or not at all.

use std::panic::{self, AssertUnwindSafe};

use frost_math::Vec4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::camera::PinholeCamera;
use crate::error::{FrameError, RenderError, RenderResult};
use crate::kernel::{KernelParams, PathKernel};
use crate::target::AccumulationBuffer;

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's first pixel
    pub x: u32,
    /// Y coordinate of the tile's first pixel
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Index of this tile in the render order
    pub index: usize,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Pixel coordinates of the tile in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 16;

/// Generate tiles for an image, ordered from the center outwards.
pub fn generate_tiles(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let tile_size = tile_size.max(1);
    let mut tiles = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let tw = tile_size.min(width - x);
            let th = tile_size.min(height - y);
            tiles.push(Tile::new(x, y, tw, th, 0));
            x += tile_size;
        }
        y += tile_size;
    }

    sort_center_out(&mut tiles, width, height);

    for (i, tile) in tiles.iter_mut().enumerate() {
        tile.index = i;
    }

    tiles
}

/// Sort tiles by distance of their center from the image center.
fn sort_center_out(tiles: &mut [Tile], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let dist = |t: &Tile| {
        let cx = t.x as f32 + t.width as f32 / 2.0;
        let cy = t.y as f32 + t.height as f32 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };

    // Stable, so equidistant tiles keep row-major order
    tiles.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
}

/// Samples traced for one tile, in the tile's row-major pixel order.
#[derive(Debug, Clone)]
pub struct TileResult {
    pub tile: Tile,
    pub samples: Vec<Vec4>,
}

/// Something that can trace one frame into an accumulation buffer.
///
/// Implementations must either blend a sample into every pixel of `target`
/// using `params.blend`, or return an error and leave `target` untouched.
pub trait FrameTracer {
    fn trace_frame(
        &self,
        params: &KernelParams<'_, '_>,
        camera: &PinholeCamera,
        frame: u32,
        target: &mut AccumulationBuffer,
    ) -> Result<(), FrameError>;
}

/// Multi-threaded tracer generating primary rays in packets of `N`.
pub struct TiledScheduler<const N: usize> {
    pool: ThreadPool,
    seed: u64,
    tile_size: u32,
    /// Index of a tile whose worker panics, `usize::MAX` for none
    #[cfg(test)]
    fail_tile: std::sync::atomic::AtomicUsize,
}

impl<const N: usize> TiledScheduler<N> {
    /// Start a pool of `threads` workers.
    pub fn new(threads: usize, seed: u64) -> RenderResult<Self> {
        if threads == 0 {
            return Err(RenderError::NoThreads);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("frost-worker-{i}"))
            .build()?;
        log::debug!("Started {} render threads, {} rays per packet", threads, N);

        Ok(Self {
            pool,
            seed,
            tile_size: DEFAULT_TILE_SIZE,
            #[cfg(test)]
            fail_tile: std::sync::atomic::AtomicUsize::new(usize::MAX),
        })
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// RNG for one tile of one frame, independent of which worker runs it.
    fn tile_rng(&self, frame: u32, tile: &Tile) -> StdRng {
        let stream = (u64::from(frame) << 32) | tile.index as u64;
        StdRng::seed_from_u64(self.seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn render_tile(
        &self,
        kernel: &PathKernel<'_, '_, '_>,
        camera: &PinholeCamera,
        frame: u32,
        tile: &Tile,
    ) -> TileResult {
        #[cfg(test)]
        if self.fail_tile.load(std::sync::atomic::Ordering::Relaxed) == tile.index {
            panic!("tile {} failed", tile.index);
        }

        let mut rng = self.tile_rng(frame, tile);
        let pixels: Vec<(u32, u32)> = tile.pixels().collect();
        let mut samples = Vec::with_capacity(tile.pixel_count() as usize);

        for chunk in pixels.chunks(N) {
            let packet = camera.generate_packet::<N>(chunk, &mut rng);
            let result = packet.map(|ray| kernel.trace(ray, &mut rng));
            samples.extend(result.iter().map(|(_, color)| color));
        }

        TileResult {
            tile: *tile,
            samples,
        }
    }
}

impl<const N: usize> FrameTracer for TiledScheduler<N> {
    fn trace_frame(
        &self,
        params: &KernelParams<'_, '_>,
        camera: &PinholeCamera,
        frame: u32,
        target: &mut AccumulationBuffer,
    ) -> Result<(), FrameError> {
        let target_size = (target.width(), target.height());
        if camera.resolution() != target_size {
            return Err(FrameError::BufferMismatch {
                camera: camera.resolution(),
                target: target_size,
            });
        }

        let tiles = generate_tiles(target_size.0, target_size.1, self.tile_size);
        let kernel = PathKernel::new(params);

        let results: Result<Vec<TileResult>, FrameError> = self.pool.install(|| {
            tiles
                .par_iter()
                .map(|tile| {
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        self.render_tile(&kernel, camera, frame, tile)
                    }))
                    .map_err(|payload| FrameError::WorkerPanicked {
                        message: panic_message(payload.as_ref()),
                    })
                })
                .collect()
        });
        let results = results?;

        for result in results {
            for ((x, y), sample) in result.tile.pixels().zip(result.samples) {
                target.blend_pixel(x, y, sample, params.blend);
            }
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
