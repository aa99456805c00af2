//! Fixed-width ray packets.
//!
//! A packet carries up to `N` primary rays together with the pixel each one
//! belongs to. The lane count is a compile-time constant; a partially
//! filled packet (at the edge of a tile) simply has fewer active lanes.

use frost_math::{Ray, Vec4};

#[derive(Debug, Clone, Copy)]
pub struct RayPacket<const N: usize> {
    rays: [Ray; N],
    pixels: [(u32, u32); N],
    active: usize,
}

impl<const N: usize> RayPacket<N> {
    /// Number of lanes in a full packet.
    pub const LANES: usize = N;

    pub fn new() -> Self {
        Self {
            rays: [Ray::default(); N],
            pixels: [(0, 0); N],
            active: 0,
        }
    }

    /// Add a ray for `pixel`. Ignored once the packet is full.
    pub fn push(&mut self, ray: Ray, pixel: (u32, u32)) {
        if !self.is_full() {
            self.rays[self.active] = ray;
            self.pixels[self.active] = pixel;
            self.active += 1;
        }
    }

    /// Number of active lanes.
    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn is_full(&self) -> bool {
        self.active == N
    }

    pub fn ray(&self, lane: usize) -> &Ray {
        &self.rays[lane]
    }

    pub fn pixel(&self, lane: usize) -> (u32, u32) {
        self.pixels[lane]
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays[..self.active]
    }

    /// Run `f` on every active lane, collecting one color per lane.
    pub fn map<F>(&self, mut f: F) -> PacketResult<N>
    where
        F: FnMut(&Ray) -> Vec4,
    {
        let mut colors = [Vec4::ZERO; N];
        for (color, ray) in colors.iter_mut().zip(self.rays()) {
            *color = f(ray);
        }
        PacketResult {
            colors,
            pixels: self.pixels,
            active: self.active,
        }
    }
}

impl<const N: usize> Default for RayPacket<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-lane colors produced by tracing a [`RayPacket`].
#[derive(Debug, Clone, Copy)]
pub struct PacketResult<const N: usize> {
    colors: [Vec4; N],
    pixels: [(u32, u32); N],
    active: usize,
}

impl<const N: usize> PacketResult<N> {
    /// Active lanes as `(pixel, color)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), Vec4)> + '_ {
        self.pixels[..self.active]
            .iter()
            .copied()
            .zip(self.colors[..self.active].iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_math::Vec3;

    #[test]
    fn test_push_stops_when_full() {
        let mut packet = RayPacket::<2>::new();
        assert!(packet.is_empty());

        for i in 0..3 {
            packet.push(Ray::new(Vec3::ZERO, Vec3::X), (i, 0));
        }
        assert!(packet.is_full());
        assert_eq!(packet.len(), 2);
        assert_eq!(packet.pixel(1), (1, 0));
        assert_eq!(RayPacket::<2>::LANES, 2);
    }

    #[test]
    fn test_map_only_visits_active_lanes() {
        let mut packet = RayPacket::<8>::new();
        packet.push(Ray::new(Vec3::ZERO, Vec3::X), (4, 5));
        packet.push(Ray::new(Vec3::ZERO, Vec3::Y), (6, 7));

        let mut calls = 0;
        let result = packet.map(|ray| {
            calls += 1;
            ray.direction().extend(1.0)
        });

        assert_eq!(calls, 2);
        let lanes: Vec<_> = result.iter().collect();
        assert_eq!(
            lanes,
            vec![
                ((4, 5), Vec4::new(1.0, 0.0, 0.0, 1.0)),
                ((6, 7), Vec4::new(0.0, 1.0, 0.0, 1.0)),
            ]
        );
    }
}
