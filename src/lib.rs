//! Scanline ray tracer for sphere scenes
//!
//! This library casts one ray per pixel from a virtual camera, finds the nearest
//! sphere intersection and shades it with a local Phong-style model. Rendering is
//! incremental: one scanline per tick, so a host can show partial progress.

pub mod config;
pub mod math;
pub mod renderer;
pub mod scene;
pub mod terminal;

pub use config::{load_config, ConfigError, SceneConfig};
pub use math::{Color, Point3, Rgb8, Vector3};
pub use renderer::{
    AmbientMode, CancelToken, Framebuffer, RayTracer, RenderError, RenderPass, RenderStats,
    RowStatus, Surface,
};
pub use scene::{Eye, Light, Scene, SceneError, Sphere};

/// Canvas color a surface is cleared to before a pass starts (light yellow)
pub const CANVAS_COLOR: Rgb8 = Rgb8 { r: 255, g: 255, b: 224 };

/// Default minimum intersection distance for a valid hit
pub const DEFAULT_MIN_T: f64 = 1e-9;
