//! Occlusion culling for OBJ scenes
//!
//! Loads a model, decides which triangles are visible from a camera and writes
//! the kept and culled faces.
//!
//! Usage:
//!     zcull [OPTIONS] <MODEL.obj>
//!
//! Options:
//!     -c, --config <FILE>     JSON run configuration
//!     -m, --mode <MODE>       naive, zpyramid or octree (default: octree)
//!     -o, --output <DIR>      Output directory (default: .)
//!     --width <PX>            Viewport width (default: 1920)
//!     --height <PX>           Viewport height (default: 1080)
//!     --fovy <DEG>            Vertical field of view (default: 45)
//!     --max-depth <DEPTH>     Octree max depth (default: 10)
//!     --leaf-size <N>         Octree leaf triangle limit (default: 16)
//!     --preview               Write preview.png (flat modes only shade it)
//!     -h, --help              Show this help message

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use glam::Mat4;

use zcull::config::CullConfig;
use zcull::core::logging;
use zcull::render::{RenderMode, RenderStats, VisibilityEngine};
use zcull::scene::{export, CullSummary, ObjModel, Scene};

fn print_help() {
    eprintln!("zcull - Occlusion culling for OBJ scenes");
    eprintln!();
    eprintln!("Usage: zcull [OPTIONS] <MODEL.obj>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    -c, --config <FILE>     JSON run configuration");
    eprintln!("    -m, --mode <MODE>       naive, zpyramid or octree (default: octree)");
    eprintln!("    -o, --output <DIR>      Output directory (default: .)");
    eprintln!("    --width <PX>            Viewport width (default: 1920)");
    eprintln!("    --height <PX>           Viewport height (default: 1080)");
    eprintln!("    --fovy <DEG>            Vertical field of view (default: 45)");
    eprintln!("    --max-depth <DEPTH>     Octree max depth (default: 10)");
    eprintln!("    --leaf-size <N>         Octree leaf triangle limit (default: 16)");
    eprintln!("    --preview               Write preview.png");
    eprintln!("    -h, --help              Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    zcull -m zpyramid --preview -o ./out scene.obj");
    eprintln!("    zcull -c cull.json scene.obj");
}

#[derive(Debug, Default)]
struct Overrides {
    mode: Option<RenderMode>,
    width: Option<u32>,
    height: Option<u32>,
    fovy: Option<f32>,
    max_depth: Option<u8>,
    leaf_size: Option<usize>,
}

#[derive(Debug)]
struct Args {
    model: PathBuf,
    config: Option<PathBuf>,
    output_dir: PathBuf,
    preview: bool,
    overrides: Overrides,
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i).map(String::as_str).ok_or_else(|| format!("Missing value for {}", flag))
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        return Err("Missing model path".to_string());
    }

    let mut model: Option<PathBuf> = None;
    let mut config: Option<PathBuf> = None;
    let mut output_dir = PathBuf::from(".");
    let mut preview = false;
    let mut overrides = Overrides::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                config = Some(PathBuf::from(next_value(&args, &mut i, "--config")?));
            }
            "-m" | "--mode" => {
                let value = next_value(&args, &mut i, "--mode")?;
                overrides.mode = Some(value.parse().map_err(|e| format!("{}", e))?);
            }
            "-o" | "--output" => {
                output_dir = PathBuf::from(next_value(&args, &mut i, "--output")?);
            }
            "--width" => {
                let value = next_value(&args, &mut i, "--width")?;
                overrides.width = Some(value.parse().map_err(|_| format!("Invalid width: {}", value))?);
            }
            "--height" => {
                let value = next_value(&args, &mut i, "--height")?;
                overrides.height = Some(value.parse().map_err(|_| format!("Invalid height: {}", value))?);
            }
            "--fovy" => {
                let value = next_value(&args, &mut i, "--fovy")?;
                overrides.fovy = Some(value.parse().map_err(|_| format!("Invalid fovy: {}", value))?);
            }
            "--max-depth" => {
                let value = next_value(&args, &mut i, "--max-depth")?;
                overrides.max_depth = Some(value.parse().map_err(|_| format!("Invalid max-depth: {}", value))?);
            }
            "--leaf-size" => {
                let value = next_value(&args, &mut i, "--leaf-size")?;
                overrides.leaf_size = Some(value.parse().map_err(|_| format!("Invalid leaf-size: {}", value))?);
            }
            "--preview" => preview = true,
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            path => {
                if model.is_some() {
                    return Err("Multiple models specified".to_string());
                }
                model = Some(PathBuf::from(path));
            }
        }
        i += 1;
    }

    let model = model.ok_or("Missing model path")?;

    Ok(Args { model, config, output_dir, preview, overrides })
}

fn resolve_config(args: &Args) -> zcull::core::Result<CullConfig> {
    let mut config = match &args.config {
        Some(path) => CullConfig::load(path)?,
        None => CullConfig::default(),
    };
    let o = &args.overrides;
    if let Some(mode) = o.mode {
        config.mode = mode;
    }
    if let Some(width) = o.width {
        config.width = width;
    }
    if let Some(height) = o.height {
        config.height = height;
    }
    if let Some(fovy) = o.fovy {
        config.fovy = fovy;
    }
    if let Some(max_depth) = o.max_depth {
        config.octree.max_depth = max_depth;
    }
    if let Some(leaf_size) = o.leaf_size {
        config.octree.max_leaf_triangles = leaf_size;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> zcull::core::Result<(RenderStats, Scene, Vec<glam::Vec3>)> {
    let config = resolve_config(args)?;

    let model = ObjModel::load(&args.model)?;
    let positions = model.positions.clone();
    let scene = model.into_scene(&config.octree)?;

    let camera = config.camera_for(&scene)?;
    let mut engine = VisibilityEngine::with_viewport(scene, config.width, config.height)?;
    engine.init_camera(camera);
    engine.set_model_transformation(Mat4::IDENTITY)?;
    engine.set_shader(config.shader.shader());

    let stats = engine.render(config.mode)?;

    if args.preview {
        if !config.mode.shades() {
            log::warn!("{} mode writes depth only; the preview will be blank", config.mode);
        }
        if let Some(image) = engine.image() {
            let path = args.output_dir.join("preview.png");
            match image.save_png(&path) {
                Ok(()) => log::info!("Wrote {}", path.display()),
                Err(e) => log::warn!("Failed to write {}: {}", path.display(), e),
            }
        }
    }

    Ok((stats, engine.into_scene(), positions))
}

/// Outputs are best effort: a failed file is reported and the rest still written
fn write_outputs(dir: &Path, scene: &Scene, positions: &[glam::Vec3]) {
    if let Err(e) = export::write_face_lists(scene, &dir.join("kept_faces.obj"), &dir.join("culled_faces.obj")) {
        log::warn!("Failed to write face lists: {}", e);
    }
    if let Err(e) = export::write_model_buffers(scene, positions, &dir.join("kept.bin"), &dir.join("culled.bin")) {
        log::warn!("Failed to write model buffers: {}", e);
    }
    let summary_path = dir.join("summary.json");
    if let Err(e) = CullSummary::from_scene(scene).save(&summary_path) {
        log::warn!("Failed to write {}: {}", summary_path.display(), e);
    }
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&args.output_dir) {
        eprintln!("Error creating {}: {}", args.output_dir.display(), e);
        std::process::exit(1);
    }

    let total_start = Instant::now();
    let (stats, scene, positions) = match run(&args) {
        Ok(result) => result,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    write_outputs(&args.output_dir, &scene, &positions);

    println!();
    println!("Summary:");
    println!("  Mode: {}", stats.mode);
    println!("  Triangles: {}", stats.triangles);
    println!("  Kept: {}", stats.visible);
    println!("  Culled: {} ({} back-facing, {} outside view, {} occluded, {} in culled nodes)",
             stats.deleted(),
             stats.back_facing,
             stats.outside_frustum,
             stats.occluded,
             stats.node_culled);
    println!("  Pass time: {:.2}ms", stats.elapsed_ms);
    println!("  Total time: {:.2}s", total_start.elapsed().as_secs_f64());
    println!("  Output: {}", args.output_dir.display());
}
