//! scanline-rt: sphere ray tracer
//!
//! Usage:
//!   scanline-rt render --scene scenes/three_spheres.yaml --output out.png
//!   scanline-rt view --scene scenes/three_spheres.yaml
//!   scanline-rt check-scene --scene scenes/three_spheres.yaml
//!
//! Without `--scene` the built-in demo scene is used.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use scanline_rt::config::{RenderConfig, SceneConfig};
use scanline_rt::renderer::{Framebuffer, RowStatus};
use scanline_rt::terminal::{parse_key_event, to_halfblock, Action, TerminalDisplay};
use scanline_rt::{RayTracer, Scene, CANVAS_COLOR};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "scanline-rt")]
#[command(version = "0.1.0")]
#[command(about = "Scanline ray tracer for sphere scenes")]
struct Cli {
    /// Path to a YAML scene file (defaults to the built-in demo scene)
    #[arg(short, long, global = true)]
    scene: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the scene to an image file (PNG or PPM, by extension)
    Render {
        #[arg(short, long, default_value = "render.png")]
        output: PathBuf,
        /// Shade scanlines on all cores instead of one row per tick
        #[arg(long)]
        parallel: bool,
    },

    /// Render progressively in the terminal, one scanline per tick
    View,

    /// Validate a scene file and print a summary
    CheckScene,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level_filter = if let Some(level) = cli.log_level {
        level.to_string()
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            .to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&level_filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render { output, parallel } => render(cli.scene.as_deref(), &output, parallel),
        Commands::View => view(cli.scene.as_deref()),
        Commands::CheckScene => check_scene(cli.scene.as_deref()),
    }
}

/// Scene plus render settings, from a file or the demo
fn load(scene_path: Option<&Path>) -> anyhow::Result<(Scene, RenderConfig)> {
    match scene_path {
        Some(path) => {
            tracing::info!("Loading scene from {:?}", path);
            let config = SceneConfig::from_file(path)?;
            let scene = config.build_scene().map_err(|e| {
                tracing::warn!(error = %e, "Scene rejected");
                e
            })?;
            Ok((scene, config.render))
        }
        None => {
            tracing::info!("No scene file given, using the demo scene");
            Ok((Scene::demo(), RenderConfig::default()))
        }
    }
}

fn render(scene_path: Option<&Path>, output: &Path, parallel: bool) -> anyhow::Result<()> {
    let (scene, render_config) = load(scene_path)?;
    let tracer = render_config.tracer()?;

    let (framebuffer, stats) = if parallel {
        tracer.render_parallel(&scene)
    } else {
        let mut framebuffer = Framebuffer::new(tracer.width(), tracer.height(), CANVAS_COLOR);
        let stats = tracer.draw_scene(&scene, &mut framebuffer)?;
        (framebuffer, stats)
    };

    save_image(&framebuffer, output)?;
    println!(
        "Wrote {} ({}x{}, {} rays, {:.1}% hits, {:.1} ms)",
        output.display(),
        framebuffer.width(),
        framebuffer.height(),
        stats.rays,
        stats.hit_ratio() * 100.0,
        stats.elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}

fn save_image(framebuffer: &Framebuffer, output: &Path) -> anyhow::Result<()> {
    let image = image::RgbImage::from_raw(
        framebuffer.width() as u32,
        framebuffer.height() as u32,
        framebuffer.to_rgb_bytes(),
    )
    .context("framebuffer size does not match its pixel data")?;

    image
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))
}

fn view(scene_path: Option<&Path>) -> anyhow::Result<()> {
    let (scene, render_config) = load(scene_path)?;

    let mut display = TerminalDisplay::new()?;
    let (cols, rows) = display.get_size();
    if cols == 0 || rows == 0 {
        bail!("terminal too small");
    }

    // one display pixel per half character cell
    let tracer = RayTracer::new(cols, rows * 2, render_config.screen_width, render_config.screen_height)?
        .with_ambient_mode(render_config.ambient_mode)
        .with_min_t(render_config.min_t)?;
    let mut framebuffer = Framebuffer::new(tracer.width(), tracer.height(), CANVAS_COLOR);

    let mut pass = tracer.begin(&scene);
    let cancel = pass.cancel_token();
    let mut finished = false;

    loop {
        let timeout = if finished { Duration::from_millis(100) } else { Duration::ZERO };
        if let Some(key_event) = display.poll_input(timeout)? {
            if parse_key_event(key_event) == Action::Quit {
                if finished {
                    break;
                }
                // the pass stops at the next row boundary
                cancel.cancel();
            }
        }

        if finished {
            continue;
        }

        let status = match pass.tick(&mut framebuffer) {
            RowStatus::Rendered { row } => {
                format!("Row {}/{} | [Q]uit", row + 1, tracer.screen_height())
            }
            RowStatus::Cancelled => {
                tracing::info!(rows_done = pass.current_row(), "Preview cancelled");
                break;
            }
            RowStatus::Done => {
                // quit pressed just as the last row landed
                if cancel.is_cancelled() {
                    break;
                }
                finished = true;
                let stats = pass.stats();
                format!(
                    "Done: {} rays, {:.1}% hits, {:.1} ms | [Q]uit",
                    stats.rays,
                    stats.hit_ratio() * 100.0,
                    stats.elapsed.as_secs_f64() * 1000.0
                )
            }
        };

        if let Err(e) = display.render(&to_halfblock(&framebuffer), &status) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                break;
            }
            return Err(e.into());
        }
    }

    Ok(())
}

fn check_scene(scene_path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = scene_path else {
        bail!("check-scene needs --scene <PATH>");
    };

    let config = match SceneConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Scene file error: {}", e);
            std::process::exit(1);
        }
    };

    match config.build_scene().and_then(|scene| Ok((scene, config.render.tracer()?))) {
        Ok((scene, tracer)) => {
            println!("✓ Scene file is valid\n");
            println!("Render:");
            println!("  Image:  {}x{}", tracer.width(), tracer.height());
            println!("  Screen: {}x{}", tracer.screen_width(), tracer.screen_height());
            println!("  Ambient mode: {:?}", tracer.ambient_mode());
            println!("  min_t: {:e}", tracer.min_t());
            println!("\nScene:");
            println!("  Spheres: {}", scene.spheres().len());
            println!("  Lights:  {}", scene.lights().len());
            println!("  FOV:     {:.1} deg", scene.fov().to_degrees());
            println!("  Camera:  {:?} -> {:?}", scene.camera().position, scene.camera().look_at);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Scene error: {}", e);
            std::process::exit(1);
        }
    }
}
