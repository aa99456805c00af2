//! Progressive frame accumulation.
//!
//! Each call to [`ProgressiveRenderer::render_frame`] traces one jittered
//! sample per pixel and folds it into a running mean, so after N frames
//! every pixel holds the average of N independent estimates. Resizing the
//! viewport is the only way back to an empty image.

use frost_core::Model;
use frost_math::{Camera, Vec4};

use crate::bvh::Bvh;
use crate::camera::PinholeCamera;
use crate::error::FrameError;
use crate::kernel::KernelParams;
use crate::light::PointLight;
use crate::scheduler::FrameTracer;
use crate::target::{AccumulationBuffer, Blend};

/// Per-frame shading settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub bounces: u32,
    pub epsilon: f32,
    pub background: Vec4,
    /// Head light intensity
    pub light_intensity: f32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            bounces: 4,
            epsilon: 1e-3,
            background: Vec4::new(0.0, 0.0, 0.0, 1.0),
            light_intensity: std::f32::consts::PI,
        }
    }
}

/// Drives a [`FrameTracer`] frame by frame over one scene.
pub struct ProgressiveRenderer<'s, T: FrameTracer> {
    model: &'s Model,
    bvh: &'s Bvh<'s>,
    tracer: T,
    camera: Camera,
    settings: FrameSettings,
    target: AccumulationBuffer,
    frame_num: u32,
    has_viewport: bool,
}

impl<'s, T: FrameTracer> ProgressiveRenderer<'s, T> {
    pub fn new(model: &'s Model, bvh: &'s Bvh<'s>, tracer: T, camera: Camera) -> Self {
        Self {
            model,
            bvh,
            tracer,
            camera,
            settings: FrameSettings::default(),
            target: AccumulationBuffer::default(),
            frame_num: 0,
            has_viewport: false,
        }
    }

    pub fn with_settings(mut self, settings: FrameSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the viewport size and drop everything accumulated so far.
    ///
    /// The camera keeps its pose and field of view; its aspect ratio is
    /// taken from the new size by [`Camera::set_viewport`].
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));

        self.camera.set_viewport(width, height);
        self.target.resize(width, height);
        self.frame_num = 0;
        self.has_viewport = true;
        log::debug!("Viewport resized to {}x{}, accumulation reset", width, height);
    }

    /// Trace one more frame and blend it into the running mean.
    ///
    /// On failure nothing changes: the buffer and frame count are exactly
    /// what they were before the call.
    pub fn render_frame(&mut self) -> Result<(), FrameError> {
        if !self.has_viewport {
            return Err(FrameError::NoViewport);
        }

        let next = self.frame_num + 1;
        let params = KernelParams {
            bvh: self.bvh,
            materials: self.model.materials(),
            lights: vec![PointLight::head_light(self.camera.eye, self.settings.light_intensity)],
            bounces: self.settings.bounces,
            epsilon: self.settings.epsilon,
            background: self.settings.background,
            blend: Blend::for_frame(next),
        };

        let camera = PinholeCamera::new(&self.camera);
        self.tracer.trace_frame(&params, &camera, next, &mut self.target)?;

        self.frame_num = next;
        Ok(())
    }

    /// Number of frames accumulated since the last resize.
    pub fn frame_num(&self) -> u32 {
        self.frame_num
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn target(&self) -> &AccumulationBuffer {
        &self.target
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    /// Accumulated color at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.target.pixel(x, y)
    }

    /// Quantized accumulation buffer, ready for [`crate::export_png`].
    pub fn rgba8(&self) -> &[u8] {
        self.target.as_rgba8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{build, BuildStrategy};
    use crate::scheduler::TiledScheduler;
    use std::cell::Cell;

    /// Writes the same color to every pixel, optionally failing on one frame.
    struct ConstantTracer {
        colors: Vec<Vec4>,
        fail_on: Option<u32>,
        calls: Cell<u32>,
    }

    impl ConstantTracer {
        fn new(colors: Vec<Vec4>) -> Self {
            Self {
                colors,
                fail_on: None,
                calls: Cell::new(0),
            }
        }
    }

    impl FrameTracer for ConstantTracer {
        fn trace_frame(
            &self,
            params: &KernelParams<'_, '_>,
            _camera: &PinholeCamera,
            frame: u32,
            target: &mut AccumulationBuffer,
        ) -> Result<(), FrameError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_on == Some(self.calls.get()) {
                return Err(FrameError::WorkerPanicked {
                    message: "stub failure".into(),
                });
            }
            let color = self.colors[(frame as usize - 1) % self.colors.len()];
            for y in 0..target.height() {
                for x in 0..target.width() {
                    target.blend_pixel(x, y, color, params.blend);
                }
            }
            Ok(())
        }
    }

    fn scene() -> Model {
        Model::snowman()
    }

    #[test]
    fn test_render_before_resize_fails() {
        let model = scene();
        let bvh = build(BuildStrategy::Binned, model.primitives()).unwrap();
        let tracer = ConstantTracer::new(vec![Vec4::ONE]);
        let mut renderer = ProgressiveRenderer::new(&model, &bvh, tracer, Camera::default());

        assert_eq!(renderer.render_frame(), Err(FrameError::NoViewport));
        assert_eq!(renderer.frame_num(), 0);
        assert_eq!(renderer.tracer().calls.get(), 0);
    }

    #[test]
    fn test_frames_average_to_mean() {
        let model = scene();
        let bvh = build(BuildStrategy::Binned, model.primitives()).unwrap();
        let colors = vec![
            Vec4::new(0.2, 0.4, 0.6, 1.0),
            Vec4::new(0.8, 0.0, 0.3, 1.0),
            Vec4::new(0.5, 0.5, 0.0, 1.0),
            Vec4::new(0.1, 0.9, 0.9, 1.0),
        ];
        let mut renderer = ProgressiveRenderer::new(
            &model,
            &bvh,
            ConstantTracer::new(colors.clone()),
            Camera::default(),
        );
        renderer.resize(4, 3);

        for _ in 0..colors.len() {
            renderer.render_frame().unwrap();
        }
        assert_eq!(renderer.frame_num(), 4);

        let mean = colors.iter().copied().sum::<Vec4>() / colors.len() as f32;
        for (x, y) in [(0, 0), (3, 2), (1, 1)] {
            assert!((renderer.pixel(x, y) - mean).abs().max_element() < 1e-5);
        }
    }

    #[test]
    fn test_resize_resets_accumulation() {
        let model = scene();
        let bvh = build(BuildStrategy::Binned, model.primitives()).unwrap();
        let tracer = ConstantTracer::new(vec![Vec4::ONE]);
        let mut renderer = ProgressiveRenderer::new(&model, &bvh, tracer, Camera::default());

        renderer.resize(2, 2);
        renderer.render_frame().unwrap();
        renderer.render_frame().unwrap();
        assert_eq!(renderer.frame_num(), 2);

        renderer.resize(5, 3);
        assert_eq!(renderer.frame_num(), 0);
        assert_eq!(renderer.camera().viewport(), (5, 3));
        assert!((renderer.camera().aspect - 5.0 / 3.0).abs() < 1e-6);
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(renderer.pixel(x, y), Vec4::ZERO);
            }
        }
        assert!(renderer.rgba8().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_failed_frame_leaves_state_unchanged() {
        let model = scene();
        let bvh = build(BuildStrategy::Binned, model.primitives()).unwrap();
        let mut tracer = ConstantTracer::new(vec![Vec4::new(0.2, 0.2, 0.2, 1.0), Vec4::ONE]);
        tracer.fail_on = Some(2);
        let mut renderer = ProgressiveRenderer::new(&model, &bvh, tracer, Camera::default());
        renderer.resize(2, 2);

        renderer.render_frame().unwrap();
        let before = renderer.rgba8().to_vec();

        assert!(renderer.render_frame().is_err());
        assert_eq!(renderer.frame_num(), 1);
        assert_eq!(renderer.rgba8(), &before[..]);

        // The retry is frame 2 again, so it gets the second color
        renderer.render_frame().unwrap();
        assert_eq!(renderer.frame_num(), 2);
        assert!((renderer.pixel(0, 0).x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_tiled_scheduler_is_deterministic() {
        let model = scene();
        let bvh = build(BuildStrategy::Binned, model.primitives()).unwrap();
        let mut camera = Camera::default();
        camera.view_all(&model.bbox().unwrap());

        let render = |threads: usize| {
            let tracer = TiledScheduler::<8>::new(threads, 42).unwrap();
            let mut renderer = ProgressiveRenderer::new(&model, &bvh, tracer, camera);
            renderer.resize(24, 20);
            renderer.render_frame().unwrap();
            renderer.render_frame().unwrap();
            renderer.rgba8().to_vec()
        };

        let a = render(1);
        let b = render(3);
        assert_eq!(a, b);
        // Something of the snowman is visible
        assert!(a.chunks(4).any(|p| p[0] > 0));
    }
}
