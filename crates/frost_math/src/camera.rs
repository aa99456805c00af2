use glam::Vec3;

use crate::Aabb;

/// Look-at pinhole camera with a vertical field of view and a viewport.
///
/// The aspect ratio always follows the viewport: [`Camera::set_viewport`]
/// recomputes it, so callers never have to keep the two in sync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    viewport_width: u32,
    viewport_height: u32,
}

impl Camera {
    /// Camera at `eye` looking at `center` with +Y up and a 45° field of view.
    pub fn new(eye: Vec3, center: Vec3) -> Self {
        Self {
            eye,
            center,
            up: Vec3::Y,
            fov_y: 45.0_f32.to_radians(),
            aspect: 1.0,
            viewport_width: 1,
            viewport_height: 1,
        }
    }

    pub fn look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.eye = eye;
        self.center = center;
        self.up = up;
    }

    /// Set the viewport size and re-derive the aspect ratio from it.
    ///
    /// Zero sizes are clamped to one pixel.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
        self.aspect = self.viewport_width as f32 / self.viewport_height as f32;
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }

    /// Frame `bounds`: look at its center from +Z, far enough back that the
    /// bounding sphere fits the vertical field of view.
    pub fn view_all(&mut self, bounds: &Aabb) {
        let center = bounds.centroid();
        let radius = (bounds.extent().length() * 0.5).max(1e-3);
        let distance = radius / (self.fov_y * 0.5).sin();

        self.look_at(center + Vec3::new(0.0, 0.0, distance), center, Vec3::Y);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }
}
