//! Simple progressive render example.
//!
//! Builds a ground triangle pair with a field of random spheres, accumulates
//! a few frames and saves the result as PNG.

use frost_core::{Material, Model, Primitive};
use frost_math::{Camera, Vec3};
use frost_renderer::{build, export_png, BuildStrategy, ProgressiveRenderer, TiledScheduler};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WIDTH: u32 = 480;
const HEIGHT: u32 = 270;
const FRAMES: u32 = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let start = std::time::Instant::now();
    let model = build_scene();
    println!(
        "Scene with {} primitives built in {:?}",
        model.primitives().len(),
        start.elapsed()
    );

    let bvh = build(BuildStrategy::Split, model.primitives())?;

    let camera = Camera::new(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO);
    let scheduler = TiledScheduler::<8>::new(4, 7)?;
    let mut renderer = ProgressiveRenderer::new(&model, &bvh, scheduler, camera);
    renderer.resize(WIDTH, HEIGHT);

    let start = std::time::Instant::now();
    for _ in 0..FRAMES {
        renderer.render_frame()?;
    }
    println!("Rendered {} frames in {:?}", renderer.frame_num(), start.elapsed());

    let filename = "simple_render.png";
    export_png(renderer.rgba8(), WIDTH, HEIGHT, filename)?;
    println!("Saved to {}", filename);
    Ok(())
}

fn build_scene() -> Model {
    let mut model = Model::new();
    let mut rng = StdRng::seed_from_u64(1);

    let ground = model.add_material(Material::new("ground", Vec3::splat(0.5)));
    let shiny = model.add_material(Material {
        name: "shiny".into(),
        cd: Vec3::new(0.7, 0.6, 0.5),
        kd: 0.6,
        cs: Vec3::ONE,
        ks: 0.4,
        specular_exp: 80.0,
    });

    let size = 50.0;
    let corners = [
        Vec3::new(-size, 0.0, -size),
        Vec3::new(size, 0.0, -size),
        Vec3::new(size, 0.0, size),
        Vec3::new(-size, 0.0, size),
    ];
    let mut prims = vec![
        Primitive::triangle(corners[0], corners[2], corners[1], ground),
        Primitive::triangle(corners[0], corners[3], corners[2], ground),
        Primitive::sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, shiny),
        Primitive::sphere(Vec3::new(4.0, 1.0, 0.0), 1.0, shiny),
    ];

    // Small random spheres
    for a in -5..5 {
        for b in -5..5 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let albedo = Vec3::new(
                rng.gen::<f32>() * rng.gen::<f32>(),
                rng.gen::<f32>() * rng.gen::<f32>(),
                rng.gen::<f32>() * rng.gen::<f32>(),
            );
            let material = model.add_material(Material::new(format!("diffuse{a}_{b}"), albedo));
            prims.push(Primitive::sphere(center, 0.2, material));
        }
    }

    model.append(prims);
    model
}
