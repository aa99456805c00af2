//! Pinhole camera for primary ray generation.
//!
//! Pixel `(0, 0)` is the bottom-right corner of the view: columns run right
//! to left and rows bottom to top. The exporter rotates the image by 180°
//! to get the usual top-left origin on disk.

use frost_math::{Camera, Ray, Vec3};
use rand::RngCore;

use crate::packet::RayPacket;
use crate::sampling::sample_square;

/// Ray generator derived from a [`Camera`] and its viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    eye: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_x: Vec3,
    pixel_delta_y: Vec3,
    width: u32,
    height: u32,
}

impl PinholeCamera {
    /// Snapshot the current pose and viewport of `camera`.
    pub fn new(camera: &Camera) -> Self {
        let (width, height) = camera.viewport();
        let eye = camera.eye;

        // Image plane one unit in front of the eye
        let h = (camera.fov_y / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (width as f32 / height as f32);

        let w = (eye - camera.center).normalize();
        let u = camera.up.cross(w).normalize();
        let v = w.cross(u);

        // x grows towards -u (right to left), y grows towards +v (upwards)
        let viewport_x = -viewport_width * u;
        let viewport_y = viewport_height * v;

        let pixel_delta_x = viewport_x / width as f32;
        let pixel_delta_y = viewport_y / height as f32;

        let corner = eye - w - viewport_x / 2.0 - viewport_y / 2.0;
        let pixel00_loc = corner + 0.5 * (pixel_delta_x + pixel_delta_y);

        Self {
            eye,
            pixel00_loc,
            pixel_delta_x,
            pixel_delta_y,
            width,
            height,
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Ray through the center of pixel `(x, y)` shifted by `offset` pixels.
    pub fn ray_at(&self, x: u32, y: u32, offset: (f32, f32)) -> Ray {
        let pixel_sample = self.pixel00_loc
            + (x as f32 + offset.0) * self.pixel_delta_x
            + (y as f32 + offset.1) * self.pixel_delta_y;
        Ray::new(self.eye, (pixel_sample - self.eye).normalize())
    }

    /// Jittered ray for pixel `(x, y)`.
    pub fn get_ray(&self, x: u32, y: u32, rng: &mut dyn RngCore) -> Ray {
        self.ray_at(x, y, sample_square(rng))
    }

    /// Jittered rays for up to `N` pixels at once.
    pub fn generate_packet<const N: usize>(
        &self,
        pixels: &[(u32, u32)],
        rng: &mut dyn RngCore,
    ) -> RayPacket<N> {
        let mut packet = RayPacket::new();
        for &(x, y) in pixels.iter().take(N) {
            packet.push(self.get_ray(x, y, rng), (x, y));
        }
        packet
    }
}
