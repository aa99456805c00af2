//! Frost Renderer - progressive CPU path tracing.
//!
//! - **Acceleration**: flat BVH with binned SAH, spatial-split and LBVH
//!   builders ([`accel::build`])
//! - **Kernel**: plastic shading, point lights and diffuse bounces
//!   ([`PathKernel`])
//! - **Scheduling**: tiles traced in parallel on a rayon pool, rays
//!   generated in fixed-width packets ([`TiledScheduler`])
//! - **Accumulation**: running per-pixel mean across frames
//!   ([`ProgressiveRenderer`])
//! - **Export**: upright RGB PNG output ([`export_png`])

pub mod accel;
pub mod bvh;
mod camera;
pub mod config;
mod error;
mod export;
mod kernel;
mod light;
mod material;
mod packet;
mod progressive;
pub mod sampling;
mod scheduler;
mod target;

pub use accel::{build, BuildError, BuildStrategy};
pub use bvh::{Bvh, BvhNode, Hit};
pub use camera::PinholeCamera;
pub use config::{ConfigError, RenderConfig};
pub use error::{FrameError, RenderError, RenderResult};
pub use export::{export_png, framebuffer_to_image};
pub use kernel::{KernelParams, PathKernel};
pub use light::{LightSample, PointLight};
pub use material::{Color, Plastic};
pub use packet::{PacketResult, RayPacket};
pub use progressive::{FrameSettings, ProgressiveRenderer};
pub use scheduler::{
    generate_tiles, FrameTracer, Tile, TileResult, TiledScheduler, DEFAULT_TILE_SIZE,
};
pub use target::{AccumulationBuffer, Blend, Rgba8};

/// Re-export common math types from frost_math
pub use frost_math::{Aabb, Interval, Ray, Vec3, Vec4};
