use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use frost_core::{load_model, read_camera_file, write_camera_file, Model};
use frost_math::Camera;
use frost_renderer::{
    build, export_png, BuildStrategy, ProgressiveRenderer, RenderConfig, TiledScheduler,
};

/// Rays per packet in the render kernel.
const PACKET_WIDTH: usize = 8;

/// Render OBJ scenes with a progressive path tracer and write a PNG.
#[derive(Parser, Debug)]
#[command(name = "frost", version, about, long_about = None)]
struct Args {
    /// Scene files (.obj); the built-in snowman scene is rendered when omitted
    inputs: Vec<String>,

    /// JSON render configuration; flags below override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Image width in pixels
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Render worker threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Tile edge in pixels
    #[arg(long)]
    tile_size: Option<u32>,

    /// Frames to accumulate (one sample per pixel each)
    #[arg(short, long)]
    spp: Option<u32>,

    /// BVH build strategy: binned, split or lbvh
    #[arg(long)]
    bvh: Option<BuildStrategy>,

    /// Output PNG path
    #[arg(short, long)]
    output: Option<String>,

    /// Camera file with eye, center and up vectors
    #[arg(short, long, value_name = "FILE")]
    camera: Option<PathBuf>,

    /// Write the camera used for the render to this file
    #[arg(long, value_name = "FILE")]
    save_camera: Option<PathBuf>,

    /// Maximum path segments per sample
    #[arg(long)]
    bounces: Option<u32>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> log::LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => log::LevelFilter::Warn,
            (false, 0) => log::LevelFilter::Info,
            (false, 1) => log::LevelFilter::Debug,
            (false, _) => log::LevelFilter::Trace,
        }
    }

    /// Config file (or defaults) with command-line overrides applied.
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(tile_size) = self.tile_size {
            config.tile_size = tile_size;
        }
        if let Some(spp) = self.spp {
            config.spp = spp;
        }
        if let Some(bvh) = self.bvh {
            config.bvh = bvh;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(camera) = &self.camera {
            config.camera = Some(camera.clone());
        }
        if let Some(bounces) = self.bounces {
            config.bounces = bounces;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Camera from the camera file if it can be read, otherwise framing the
/// whole model.
fn setup_camera(model: &Model, config: &RenderConfig) -> Camera {
    let mut camera = Camera::default();
    camera.fov_y = config.fov_y.to_radians();

    let pose = config.camera.as_ref().and_then(|path| match read_camera_file(path) {
        Ok(pose) => {
            log::info!("Using camera from {}", path.display());
            Some(pose)
        }
        Err(e) => {
            log::warn!(
                "Could not read camera file {}: {}, framing the scene instead",
                path.display(),
                e
            );
            None
        }
    });

    match (pose, model.bbox()) {
        (Some(pose), _) => pose.apply(&mut camera),
        (None, Some(bbox)) => camera.view_all(&bbox),
        (None, None) => {}
    }
    camera
}

fn run(inputs: &[String], config: &RenderConfig, save_camera: Option<&Path>) -> Result<()> {
    let model = if inputs.is_empty() {
        log::info!("No input files, rendering the built-in snowman scene");
        Model::snowman()
    } else {
        let start = Instant::now();
        let model = load_model(inputs).context("Failed to load scene")?;
        log::info!("Loaded {} file(s) in {:.2?}", inputs.len(), start.elapsed());
        model
    };
    log::info!(
        "Scene has {} primitives and {} materials",
        model.primitives().len(),
        model.materials().len()
    );

    let bvh = build(config.bvh, model.primitives()).context("Failed to build BVH")?;

    let camera = setup_camera(&model, config);
    if let Some(path) = save_camera {
        write_camera_file(path, &camera)
            .with_context(|| format!("Failed to write camera file {}", path.display()))?;
    }

    let scheduler = TiledScheduler::<PACKET_WIDTH>::new(config.threads, config.seed)?
        .with_tile_size(config.tile_size);
    let threads = scheduler.threads();
    let mut renderer = ProgressiveRenderer::new(&model, &bvh, scheduler, camera)
        .with_settings(config.frame_settings());
    renderer.resize(config.width, config.height);

    log::info!(
        "Rendering {}x{}, {} frames on {} threads",
        config.width,
        config.height,
        config.spp,
        threads
    );
    let start = Instant::now();
    for frame in 1..=config.spp {
        match renderer.render_frame() {
            Ok(()) => log::debug!("Frame {}/{} done", frame, config.spp),
            Err(e) => log::warn!("Frame {}/{} failed, skipping: {}", frame, config.spp, e),
        }
    }

    if renderer.frame_num() == 0 {
        bail!("No frame completed, nothing to export");
    }
    log::info!("Accumulated {} frames in {:.2?}", renderer.frame_num(), start.elapsed());

    export_png(renderer.rgba8(), config.width, config.height, &config.output)
        .with_context(|| format!("Failed to write {}", config.output))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    log::info!("Starting Frost");

    let config = args.render_config()?;
    run(&args.inputs, &config, args.save_camera.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use frost_math::Vec3;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "frost", "-W", "64", "-H", "32", "--spp", "2", "--bvh", "lbvh", "-o", "out.png",
            "--tile-size", "8", "a.obj",
        ])
        .unwrap();
        let config = args.render_config().unwrap();

        assert_eq!(args.inputs, vec!["a.obj".to_string()]);
        assert_eq!((config.width, config.height), (64, 32));
        assert_eq!(config.spp, 2);
        assert_eq!(config.bvh, BuildStrategy::Lbvh);
        assert_eq!(config.output, "out.png");
        assert_eq!(config.threads, 8);
        assert_eq!(config.tile_size, 8);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        std::fs::write(&path, r#"{ "width": 100, "spp": 3, "bvh": "split" }"#).unwrap();

        let path = path.to_str().unwrap();
        let args = Args::try_parse_from(["frost", "--config", path, "--spp", "5"]).unwrap();
        let config = args.render_config().unwrap();

        assert_eq!(config.width, 100);
        assert_eq!(config.spp, 5);
        assert_eq!(config.bvh, BuildStrategy::Split);
    }

    #[test]
    fn test_bad_strategy_is_rejected() {
        assert!(Args::try_parse_from(["frost", "--bvh", "kdtree"]).is_err());
    }

    #[test]
    fn test_log_levels() {
        let quiet = Args::try_parse_from(["frost", "-q"]).unwrap();
        assert_eq!(quiet.log_level(), log::LevelFilter::Warn);
        let verbose = Args::try_parse_from(["frost", "-vv"]).unwrap();
        assert_eq!(verbose.log_level(), log::LevelFilter::Trace);
        assert!(Args::try_parse_from(["frost", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_missing_camera_file_frames_scene() {
        let model = Model::snowman();
        let config = RenderConfig {
            camera: Some(PathBuf::from("/nonexistent/view.cam")),
            ..RenderConfig::default()
        };

        let camera = setup_camera(&model, &config);
        let bbox = model.bbox().unwrap();
        assert_eq!(camera.center, bbox.centroid());
        assert!(camera.eye.z > bbox.z.max);
    }

    #[test]
    fn test_camera_file_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.cam");
        std::fs::write(&path, "(1, 2, 3) (0, 0, 0) (0, 1, 0)").unwrap();

        let config = RenderConfig {
            camera: Some(path),
            ..RenderConfig::default()
        };
        let camera = setup_camera(&Model::snowman(), &config);
        assert_eq!(camera.eye, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.center, Vec3::ZERO);
    }

    #[test]
    fn test_run_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("snowman.png");
        let camera_out = dir.path().join("used.cam");
        let config = RenderConfig {
            width: 16,
            height: 12,
            spp: 2,
            threads: 2,
            tile_size: 5,
            output: output.to_str().unwrap().to_string(),
            ..RenderConfig::default()
        };

        run(&[], &config, Some(camera_out.as_path())).unwrap();

        let image = frost_core::load_image(output.to_str().unwrap()).unwrap();
        assert_eq!((image.width, image.height), (16, 12));
        assert!(read_camera_file(&camera_out).is_ok());
    }

    #[test]
    fn test_run_fails_on_unknown_scene_type() {
        let config = RenderConfig::default();
        let err = run(&["scene.fbx".to_string()], &config, None).unwrap_err();
        assert!(format!("{err:#}").contains("unknown file type"));
    }
}
