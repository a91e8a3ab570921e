mod loader;

use crate::math::{Color, Point3, Vector3};
use crate::renderer::{AmbientMode, RayTracer, RenderError};
use crate::scene::{Scene, SceneError, DEFAULT_FOV_DEGREES};
use crate::DEFAULT_MIN_T;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use loader::load_config;

/// Scene file: image settings plus the scene contents
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default = "default_black")]
    pub background: [f64; 3],
    #[serde(default = "default_black")]
    pub ambient: [f64; 3],
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov: f64,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub lights: Vec<LightConfig>,
    #[serde(default)]
    pub spheres: Vec<SphereConfig>,
}

/// Image size, sample grid and shading options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default = "default_image_size")]
    pub width: usize,
    #[serde(default = "default_image_size")]
    pub height: usize,
    #[serde(default = "default_screen_size")]
    pub screen_width: usize,
    #[serde(default = "default_screen_size")]
    pub screen_height: usize,
    #[serde(default)]
    pub ambient_mode: AmbientMode,
    #[serde(default = "default_min_t")]
    pub min_t: f64,
}

/// Camera placement
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    pub position: [f64; 3],
    pub look_at: [f64; 3],
    #[serde(default = "default_up")]
    pub up: [f64; 3],
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LightConfig {
    pub color: [f64; 3],
    pub position: [f64; 3],
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SphereConfig {
    pub center: [f64; 3],
    pub radius: f64,
    pub diffuse: [f64; 3],
    #[serde(default)]
    pub k_ambient: f64,
    #[serde(default)]
    pub k_specular: f64,
    #[serde(default = "default_specular_exponent")]
    pub specular_exponent: f64,
}

fn default_black() -> [f64; 3] {
    [0.0, 0.0, 0.0]
}

fn default_fov() -> f64 {
    DEFAULT_FOV_DEGREES
}

fn default_image_size() -> usize {
    512
}

fn default_screen_size() -> usize {
    128
}

fn default_min_t() -> f64 {
    DEFAULT_MIN_T
}

fn default_up() -> [f64; 3] {
    [0.0, 1.0, 0.0]
}

fn default_specular_exponent() -> f64 {
    1.0
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            background: default_black(),
            ambient: default_black(),
            fov: default_fov(),
            camera: CameraConfig::default(),
            lights: Vec::new(),
            spheres: Vec::new(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_image_size(),
            height: default_image_size(),
            screen_width: default_screen_size(),
            screen_height: default_screen_size(),
            ambient_mode: AmbientMode::default(),
            min_t: default_min_t(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            look_at: [0.0, 0.0, -1.0],
            up: default_up(),
        }
    }
}

impl RenderConfig {
    /// Build the tracer described by this section
    pub fn tracer(&self) -> Result<RayTracer, ConfigError> {
        if !self.min_t.is_finite() || self.min_t < 0.0 {
            return Err(ConfigError::Validation(format!(
                "render.min_t must be finite and non-negative, got {}",
                self.min_t
            )));
        }
        Ok(
            RayTracer::new(self.width, self.height, self.screen_width, self.screen_height)?
                .with_ambient_mode(self.ambient_mode)
                .with_min_t(self.min_t)?,
        )
    }
}

impl SceneConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        load_config(path)
    }

    /// Load from `path`, or fall back to the default locations
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_paths = ["scene.yaml", "scene.yml", "./scenes/scene.yaml"];
                for p in default_paths {
                    let path = Path::new(p);
                    if path.exists() {
                        return Self::from_file(path);
                    }
                }
                Err(ConfigError::NotFound(
                    "No scene file found. Tried: scene.yaml, scene.yml, ./scenes/scene.yaml".to_string(),
                ))
            }
        }
    }

    /// Replay this description through the scene mutators, starting from a
    /// reset scene. The first rejected call aborts the build.
    pub fn build_scene(&self) -> Result<Scene, ConfigError> {
        let mut scene = Scene::new();
        scene.reset_scene();

        scene.set_background(Color::from(self.background))?;
        scene.set_ambient_light(Color::from(self.ambient))?;
        scene.set_field_of_view(self.fov)?;
        scene.set_camera(
            Point3::from(self.camera.position),
            Point3::from(self.camera.look_at),
            Vector3::from(self.camera.up),
        )?;

        for light in &self.lights {
            scene.add_light(Color::from(light.color), Point3::from(light.position))?;
        }

        for (index, sphere) in self.spheres.iter().enumerate() {
            scene
                .add_sphere(
                    Point3::from(sphere.center),
                    sphere.radius,
                    Color::from(sphere.diffuse),
                    sphere.k_ambient,
                    sphere.k_specular,
                    sphere.specular_exponent,
                )
                .map_err(|source| ConfigError::Sphere { index, source })?;
        }

        Ok(scene)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Scene file not found: {0}")]
    NotFound(String),

    #[error("Failed to read scene file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scene file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("Invalid sphere #{index}: {source}")]
    Sphere { index: usize, source: SceneError },

    #[error("Invalid render settings: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
