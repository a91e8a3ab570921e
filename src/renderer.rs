//! Scanline ray tracer
//!
//! One eye ray per screen pixel, nearest sphere hit, local Phong shading. A
//! [`RenderPass`] advances one scanline per tick so a host loop can present
//! partial results; [`RayTracer::render_parallel`] splits the same work by rows.

use crate::math::{is_degenerate, normalize, Color, Point3, Rgb8, Vector3};
use crate::scene::{Scene, Sphere};
use crate::{CANVAS_COLOR, DEFAULT_MIN_T};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Returned by [`hit_sphere`] when the ray misses
pub const NO_HIT: f64 = -1.0;

/// A ray in 3D space. The direction is not normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

/// Near-root intersection parameter of `ray` with `sphere`, or [`NO_HIT`].
///
/// Only the entry root is computed. For a ray starting inside the sphere it is
/// negative, and callers discard it through their minimum-t check.
pub fn hit_sphere(sphere: &Sphere, ray: &Ray) -> f64 {
    let oc = ray.origin - sphere.center;
    let a = ray.direction.dot(&ray.direction);
    if a == 0.0 {
        return NO_HIT;
    }
    let b = 2.0 * oc.dot(&ray.direction);
    let c = oc.dot(&oc) - sphere.radius * sphere.radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return NO_HIT;
    }
    (-b - discriminant.sqrt()) / (2.0 * a)
}

/// Nearest intersection found along a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit<'a> {
    pub sphere: &'a Sphere,
    pub point: Point3,
    pub t: f64,
}

/// How the ambient term enters the per-pixel sum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbientMode {
    /// Added once for every light, so ambient brightness scales with the light
    /// count. Matches the classic output of this renderer.
    #[default]
    PerLight,
    /// Added exactly once per shaded pixel
    Once,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("Image and screen sizes must be non-zero (image {width}x{height}, screen {screen_width}x{screen_height})")]
    EmptyScreen {
        width: usize,
        height: usize,
        screen_width: usize,
        screen_height: usize,
    },

    #[error("Render cancelled after {rows_done} rows")]
    Cancelled { rows_done: usize },

    #[error("Minimum hit distance must be finite and non-negative, got {0}")]
    InvalidMinT(f64),
}

/// Destination for rendered pixels. Rectangles are clipped to the surface.
pub trait Surface {
    fn size(&self) -> (usize, usize);
    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgb8);

    fn clear(&mut self, color: Rgb8) {
        let (w, h) = self.size();
        self.fill_rect(0, 0, w, h, color);
    }
}

/// Dense row-major 8-bit RGB image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb8>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize, fill: Rgb8) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at (x, y), `None` outside the image
    pub fn get(&self, x: usize, y: usize) -> Option<Rgb8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[Rgb8] {
        &self.pixels
    }

    /// Top-to-bottom rows
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb8]> {
        self.pixels.chunks(self.width.max(1))
    }

    /// Interleaved RGB bytes, row-major
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.r, p.g, p.b]).collect()
    }
}

impl Surface for Framebuffer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: Rgb8) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = row * self.width;
            self.pixels[start + x.min(x_end)..start + x_end].fill(color);
        }
    }
}

/// Cooperative stop flag, checked once per scanline
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub rows: usize,
    pub rays: usize,
    pub hits: usize,
    pub elapsed: Duration,
}

impl RenderStats {
    /// Fraction of rays that hit a sphere
    pub fn hit_ratio(&self) -> f64 {
        if self.rays == 0 {
            0.0
        } else {
            self.hits as f64 / self.rays as f64
        }
    }
}

/// Outcome of a single [`RenderPass::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Rendered { row: usize },
    Done,
    Cancelled,
}

/// Image geometry and shading options
#[derive(Debug, Clone, PartialEq)]
pub struct RayTracer {
    width: usize,
    height: usize,
    screen_width: usize,
    screen_height: usize,
    ambient_mode: AmbientMode,
    min_t: f64,
}

impl RayTracer {
    /// `width`/`height` are display pixels, `screen_width`/`screen_height` the
    /// ray-traced sample grid. Each sample is upscaled to a block of display
    /// pixels.
    pub fn new(
        width: usize,
        height: usize,
        screen_width: usize,
        screen_height: usize,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || screen_width == 0 || screen_height == 0 {
            return Err(RenderError::EmptyScreen {
                width,
                height,
                screen_width,
                screen_height,
            });
        }
        Ok(Self {
            width,
            height,
            screen_width,
            screen_height,
            ambient_mode: AmbientMode::default(),
            min_t: DEFAULT_MIN_T,
        })
    }

    pub fn with_ambient_mode(mut self, mode: AmbientMode) -> Self {
        self.ambient_mode = mode;
        self
    }

    /// Near roots at or below `min_t` are not hits
    pub fn with_min_t(mut self, min_t: f64) -> Result<Self, RenderError> {
        // negative values would accept roots behind the ray origin
        if !min_t.is_finite() || min_t < 0.0 {
            return Err(RenderError::InvalidMinT(min_t));
        }
        self.min_t = min_t;
        Ok(self)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn screen_width(&self) -> usize {
        self.screen_width
    }

    pub fn screen_height(&self) -> usize {
        self.screen_height
    }

    pub fn ambient_mode(&self) -> AmbientMode {
        self.ambient_mode
    }

    pub fn min_t(&self) -> f64 {
        self.min_t
    }

    /// Eye ray through the center of screen pixel (i, j).
    ///
    /// The screen is treated as square: no aspect correction is applied, so a
    /// non-square sample grid stretches the image. Indices outside the screen
    /// give rays extrapolated past its edges.
    pub fn eye_ray(&self, scene: &Scene, i: usize, j: usize) -> Ray {
        let eye = scene.camera();
        let us = -1.0 + 2.0 * (i as f64 + 0.5) / self.screen_width as f64;
        let vs = -1.0 + 2.0 * (j as f64 + 0.5) / self.screen_height as f64;
        let d = -1.0 / (scene.fov() / 2.0).tan();

        let direction = eye.w * d + eye.u * us + eye.v * -vs;
        Ray::new(eye.origin, direction)
    }

    /// Closest sphere with a near root above `min_t`. Exact ties keep the
    /// sphere added first.
    pub fn nearest_hit<'a>(&self, scene: &'a Scene, ray: &Ray) -> Option<Hit<'a>> {
        let mut closest: Option<Hit<'a>> = None;

        for sphere in scene.spheres() {
            let t = hit_sphere(sphere, ray);
            if t == NO_HIT || t <= self.min_t || t.is_nan() {
                continue;
            }
            if closest.map_or(true, |best| t < best.t) {
                closest = Some(Hit {
                    sphere,
                    point: ray.at(t),
                    t,
                });
            }
        }

        closest
    }

    /// Shaded color for a ray, or the background if it hits nothing
    pub fn trace_ray(&self, scene: &Scene, ray: &Ray) -> Color {
        match self.nearest_hit(scene, ray) {
            Some(hit) => self.get_color(scene, hit.sphere, hit.point),
            None => scene.background(),
        }
    }

    /// Local Phong shading at `point` on `sphere`. No shadow rays: every light
    /// contributes even when occluded.
    pub fn get_color(&self, scene: &Scene, sphere: &Sphere, point: Point3) -> Color {
        let normal = normalize(point - sphere.center);
        let viewer = normalize(scene.camera().origin - point);
        let ambient = sphere.diffuse * sphere.k_ambient * scene.ambient();

        let mut color = Color::BLACK;
        for light in scene.lights() {
            if self.ambient_mode == AmbientMode::PerLight {
                color += ambient;
            }

            let light_vec = normalize(light.position - point);
            if is_degenerate(&light_vec) || is_degenerate(&normal) {
                continue;
            }

            let diffuse_cos = normal.dot(&light_vec).max(0.0);
            let reflection = normalize(normal * (2.0 * light_vec.dot(&normal)) - light_vec);

            let mut specular = 0.0;
            if !is_degenerate(&viewer) && reflection.dot(&light_vec) > 0.0 {
                specular = reflection.dot(&viewer).powf(sphere.specular_exponent);
                // negative base with a fractional exponent
                if specular.is_nan() {
                    specular = 0.0;
                }
            }

            color += sphere.diffuse * diffuse_cos * light.color;
            color += light.color * (sphere.k_specular * specular);
        }

        if self.ambient_mode == AmbientMode::Once {
            color += ambient;
        }

        color
    }

    /// Display-pixel rectangle covered by screen pixel (i, j): `(x, y, w, h)`.
    /// Footprints tile the image without gaps or overlap.
    pub fn footprint(&self, i: usize, j: usize) -> (usize, usize, usize, usize) {
        let x0 = i * self.width / self.screen_width;
        let x1 = (i + 1) * self.width / self.screen_width;
        let y0 = j * self.height / self.screen_height;
        let y1 = (j + 1) * self.height / self.screen_height;
        (x0, y0, x1 - x0, y1 - y0)
    }

    /// Colors for one scanline of the sample grid, plus its hit count
    fn shade_row(&self, scene: &Scene, j: usize) -> (Vec<Rgb8>, usize) {
        let mut hits = 0;
        let row: Vec<Rgb8> = (0..self.screen_width)
            .map(|i| {
                let ray = self.eye_ray(scene, i, j);
                let color = match self.nearest_hit(scene, &ray) {
                    Some(hit) => {
                        hits += 1;
                        self.get_color(scene, hit.sphere, hit.point)
                    }
                    None => scene.background(),
                };
                color.to_drawing_color()
            })
            .collect();
        (row, hits)
    }

    /// Upscale one scanline onto the surface
    fn blit_row(&self, surface: &mut dyn Surface, j: usize, row: &[Rgb8]) {
        for (i, color) in row.iter().enumerate() {
            let (x, y, w, h) = self.footprint(i, j);
            surface.fill_rect(x, y, w, h, *color);
        }
    }

    /// Start an incremental pass over `scene`. The scene stays borrowed, and
    /// therefore immutable, until the pass is dropped.
    pub fn begin<'a>(&'a self, scene: &'a Scene) -> RenderPass<'a> {
        self.begin_with_cancel(scene, CancelToken::new())
    }

    pub fn begin_with_cancel<'a>(&'a self, scene: &'a Scene, cancel: CancelToken) -> RenderPass<'a> {
        info!(
            screen_width = self.screen_width,
            screen_height = self.screen_height,
            width = self.width,
            height = self.height,
            spheres = scene.spheres().len(),
            lights = scene.lights().len(),
            "Starting render pass"
        );
        RenderPass {
            tracer: self,
            scene,
            row: 0,
            cancel,
            stats: RenderStats::default(),
            started: Instant::now(),
        }
    }

    /// Clear `surface` to the canvas color and render every row in order
    pub fn draw_scene(&self, scene: &Scene, surface: &mut dyn Surface) -> Result<RenderStats, RenderError> {
        self.draw_scene_with_cancel(scene, surface, CancelToken::new())
    }

    pub fn draw_scene_with_cancel(
        &self,
        scene: &Scene,
        surface: &mut dyn Surface,
        cancel: CancelToken,
    ) -> Result<RenderStats, RenderError> {
        surface.clear(CANVAS_COLOR);
        let mut pass = self.begin_with_cancel(scene, cancel);
        loop {
            match pass.tick(surface) {
                RowStatus::Rendered { .. } => {}
                RowStatus::Done => return Ok(pass.stats()),
                RowStatus::Cancelled => {
                    return Err(RenderError::Cancelled {
                        rows_done: pass.current_row(),
                    })
                }
            }
        }
    }

    /// Render the full frame with rows shaded in parallel. The output is
    /// identical to a sequential pass.
    pub fn render_parallel(&self, scene: &Scene) -> (Framebuffer, RenderStats) {
        let started = Instant::now();
        let rows: Vec<(Vec<Rgb8>, usize)> = (0..self.screen_height)
            .into_par_iter()
            .map(|j| self.shade_row(scene, j))
            .collect();

        let mut framebuffer = Framebuffer::new(self.width, self.height, CANVAS_COLOR);
        let mut hits = 0;
        for (j, (row, row_hits)) in rows.iter().enumerate() {
            self.blit_row(&mut framebuffer, j, row);
            hits += row_hits;
        }

        let stats = RenderStats {
            rows: self.screen_height,
            rays: self.screen_width * self.screen_height,
            hits,
            elapsed: started.elapsed(),
        };
        info!(
            rays = stats.rays,
            hits = stats.hits,
            elapsed_ms = stats.elapsed.as_secs_f64() * 1000.0,
            "Parallel render finished"
        );
        (framebuffer, stats)
    }
}

/// Row-at-a-time render state: `{current_row, scene, stats}`
pub struct RenderPass<'a> {
    tracer: &'a RayTracer,
    scene: &'a Scene,
    row: usize,
    cancel: CancelToken,
    stats: RenderStats,
    started: Instant,
}

impl<'a> RenderPass<'a> {
    /// Next scanline to render
    pub fn current_row(&self) -> usize {
        self.row
    }

    pub fn is_done(&self) -> bool {
        self.row >= self.tracer.screen_height
    }

    /// Completed fraction in [0, 1]
    pub fn progress(&self) -> f64 {
        self.row as f64 / self.tracer.screen_height as f64
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Shade the next scanline, or `None` when finished or cancelled
    fn advance(&mut self) -> Option<(usize, Vec<Rgb8>)> {
        if self.is_done() || self.cancel.is_cancelled() {
            return None;
        }

        let j = self.row;
        let (row, hits) = self.tracer.shade_row(self.scene, j);
        self.row += 1;
        self.stats.rows += 1;
        self.stats.rays += row.len();
        self.stats.hits += hits;
        self.stats.elapsed = self.started.elapsed();
        trace!(row = j, hits, "Row rendered");

        if self.is_done() {
            info!(
                rays = self.stats.rays,
                hits = self.stats.hits,
                elapsed_ms = self.stats.elapsed.as_secs_f64() * 1000.0,
                "Finished rendering scene"
            );
        }
        Some((j, row))
    }

    /// Render exactly one scanline onto `surface`
    pub fn tick(&mut self, surface: &mut dyn Surface) -> RowStatus {
        if self.is_done() {
            return RowStatus::Done;
        }
        match self.advance() {
            Some((j, row)) => {
                self.tracer.blit_row(surface, j, &row);
                RowStatus::Rendered { row: j }
            }
            None => {
                debug!(rows_done = self.row, "Render pass cancelled");
                RowStatus::Cancelled
            }
        }
    }
}

/// Yields `(row index, pixels)` for each scanline of the sample grid
impl Iterator for RenderPass<'_> {
    type Item = (usize, Vec<Rgb8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
