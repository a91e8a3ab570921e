//! Scene definitions: spheres, point lights, camera and the mutator API

use crate::math::{Color, Point3, Vector3};
use tracing::debug;

/// Field of view used by a freshly constructed scene, in degrees
pub const DEFAULT_FOV_DEGREES: f64 = 90.0;

/// Degrees to radians
const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Cross products shorter than this (relative to the input lengths) are
/// treated as parallel
const PARALLEL_EPSILON: f64 = 1e-12;

/// Configuration errors raised by scene mutators. The offending call is
/// rejected and the scene keeps its previous state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("Sphere radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("Field of view must be in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),

    #[error("Invalid camera basis: up vector is zero or parallel to the gaze direction, or the eye sits on the lookat point")]
    InvalidCameraBasis,

    #[error("Non-finite value for {0}")]
    NonFiniteInput(&'static str),
}

/// Sphere primitive with its Phong material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Point3,
    pub radius: f64,
    pub diffuse: Color,
    pub k_ambient: f64,
    pub k_specular: f64,
    pub specular_exponent: f64,
}

/// Point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Color,
    pub position: Point3,
}

/// Camera with its derived orthonormal basis.
///
/// `w` points from the lookat point back toward the eye, `u` is camera right
/// and `v` camera up. The basis is rebuilt, never edited in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eye {
    pub position: Point3,
    pub look_at: Point3,
    pub up: Vector3,
    pub u: Vector3,
    pub v: Vector3,
    pub w: Vector3,
    pub origin: Point3,
}

impl Eye {
    /// Build the camera basis. `up` need not be unit length or orthogonal to
    /// the gaze; it is orthonormalized here.
    pub fn new(position: Point3, look_at: Point3, up: Vector3) -> Result<Self, SceneError> {
        if !finite_point(&position) || !finite_point(&look_at) || !finite_vector(&up) {
            return Err(SceneError::NonFiniteInput("camera"));
        }

        let gaze = look_at - position;
        let gaze_len = gaze.magnitude();
        if gaze_len == 0.0 {
            return Err(SceneError::InvalidCameraBasis);
        }
        let w = -gaze / gaze_len;

        let side = up.cross(&w);
        let side_len = side.magnitude();
        if side_len <= PARALLEL_EPSILON * up.magnitude().max(1.0) {
            return Err(SceneError::InvalidCameraBasis);
        }
        let u = side / side_len;
        let v = w.cross(&u);

        Ok(Self {
            position,
            look_at,
            up,
            u,
            v,
            w,
            origin: position,
        })
    }
}

impl Default for Eye {
    /// At the origin looking down -z with +y up
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            look_at: Point3::new(0.0, 0.0, -1.0),
            up: Vector3::y(),
            u: Vector3::x(),
            v: Vector3::y(),
            w: Vector3::z(),
            origin: Point3::origin(),
        }
    }
}

/// All scene state read by the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    spheres: Vec<Sphere>,
    lights: Vec<Light>,
    ambient: Color,
    background: Color,
    camera: Eye,
    fov: f64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene: black background and ambient, 90 degree field of view,
    /// camera at the origin looking down -z
    pub fn new() -> Self {
        Self {
            spheres: Vec::new(),
            lights: Vec::new(),
            ambient: Color::BLACK,
            background: Color::BLACK,
            camera: Eye::default(),
            fov: DEFAULT_FOV_DEGREES * DEG2RAD,
        }
    }

    /// A small showcase: three spheres under a key and a fill light
    pub fn demo() -> Self {
        let sphere = |center: Point3, radius, diffuse, k_specular, specular_exponent| Sphere {
            center,
            radius,
            diffuse,
            k_ambient: 0.3,
            k_specular,
            specular_exponent,
        };

        Self {
            spheres: vec![
                sphere(Point3::origin(), 1.0, Color::new(0.9, 0.2, 0.2), 0.6, 30.0),
                sphere(Point3::new(-2.0, -0.3, -1.0), 0.7, Color::new(0.2, 0.8, 0.3), 0.3, 10.0),
                sphere(Point3::new(1.8, -0.5, 0.8), 0.5, Color::new(0.2, 0.4, 0.9), 0.9, 80.0),
            ],
            lights: vec![
                Light { color: Color::new(0.9, 0.9, 0.9), position: Point3::new(5.0, 5.0, 5.0) },
                Light { color: Color::new(0.3, 0.3, 0.4), position: Point3::new(-5.0, 2.0, 3.0) },
            ],
            ambient: Color::new(0.2, 0.2, 0.2),
            background: Color::new(0.05, 0.05, 0.12),
            camera: Eye::new(Point3::new(0.0, 1.0, 6.0), Point3::origin(), Vector3::y())
                .unwrap_or_default(),
            fov: 60.0 * DEG2RAD,
        }
    }

    /// Clear spheres and lights and zero the background and ambient light.
    /// Camera and field of view are kept.
    pub fn reset_scene(&mut self) {
        self.spheres.clear();
        self.lights.clear();
        self.background = Color::BLACK;
        self.ambient = Color::BLACK;
        debug!("Scene reset");
    }

    /// Append a point light
    pub fn add_light(&mut self, color: Color, position: Point3) -> Result<(), SceneError> {
        if !color.is_finite() {
            return Err(SceneError::NonFiniteInput("light color"));
        }
        if !finite_point(&position) {
            return Err(SceneError::NonFiniteInput("light position"));
        }
        self.lights.push(Light { color, position });
        debug!(lights = self.lights.len(), "Light added");
        Ok(())
    }

    /// Overwrite the global ambient term
    pub fn set_ambient_light(&mut self, color: Color) -> Result<(), SceneError> {
        if !color.is_finite() {
            return Err(SceneError::NonFiniteInput("ambient light"));
        }
        self.ambient = color;
        Ok(())
    }

    /// Overwrite the color returned for rays that hit nothing
    pub fn set_background(&mut self, color: Color) -> Result<(), SceneError> {
        if !color.is_finite() {
            return Err(SceneError::NonFiniteInput("background"));
        }
        self.background = color;
        Ok(())
    }

    /// Set the vertical field of view. `degrees` must lie in (0, 180).
    pub fn set_field_of_view(&mut self, degrees: f64) -> Result<(), SceneError> {
        if !(degrees > 0.0 && degrees < 180.0) {
            return Err(SceneError::InvalidFieldOfView(degrees));
        }
        self.fov = degrees * DEG2RAD;
        Ok(())
    }

    /// Rebuild the camera from an eye position, a lookat point and an up vector
    pub fn set_camera(&mut self, eye: Point3, look_at: Point3, up: Vector3) -> Result<(), SceneError> {
        self.camera = Eye::new(eye, look_at, up)?;
        debug!(?eye, ?look_at, "Camera set");
        Ok(())
    }

    /// Append a sphere. `radius` must be positive.
    pub fn add_sphere(
        &mut self,
        center: Point3,
        radius: f64,
        diffuse: Color,
        k_ambient: f64,
        k_specular: f64,
        specular_exponent: f64,
    ) -> Result<(), SceneError> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(SceneError::InvalidRadius(radius));
        }
        if !finite_point(&center) {
            return Err(SceneError::NonFiniteInput("sphere center"));
        }
        if !diffuse.is_finite() {
            return Err(SceneError::NonFiniteInput("sphere diffuse color"));
        }
        if !(k_ambient.is_finite() && k_specular.is_finite() && specular_exponent.is_finite()) {
            return Err(SceneError::NonFiniteInput("sphere coefficients"));
        }

        self.spheres.push(Sphere {
            center,
            radius,
            diffuse,
            k_ambient,
            k_specular,
            specular_exponent,
        });
        debug!(spheres = self.spheres.len(), radius, k_ambient, "Sphere added");
        Ok(())
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn ambient(&self) -> Color {
        self.ambient
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn camera(&self) -> &Eye {
        &self.camera
    }

    /// Field of view in radians
    pub fn fov(&self) -> f64 {
        self.fov
    }
}

fn finite_point(p: &Point3) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

fn finite_vector(v: &Vector3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_orthonormal(eye: &Eye) {
        for axis in [eye.u, eye.v, eye.w] {
            assert!((axis.magnitude() - 1.0).abs() < EPS, "not unit: {:?}", axis);
        }
        assert!(eye.u.dot(&eye.v).abs() < EPS);
        assert!(eye.u.dot(&eye.w).abs() < EPS);
        assert!(eye.v.dot(&eye.w).abs() < EPS);
        // right-handed: u x v = w
        assert!((eye.u.cross(&eye.v) - eye.w).magnitude() < EPS);
    }

    #[test]
    fn test_eye_basis_axis_aligned() {
        let eye = Eye::new(Point3::new(0.0, 0.0, 5.0), Point3::origin(), Vector3::y()).unwrap();
        assert!((eye.w - Vector3::z()).magnitude() < EPS);
        assert!((eye.u - Vector3::x()).magnitude() < EPS);
        assert!((eye.v - Vector3::y()).magnitude() < EPS);
        assert_eq!(eye.origin, Point3::new(0.0, 0.0, 5.0));
        assert_orthonormal(&eye);
    }

    #[test]
    fn test_eye_basis_orthonormal_for_skewed_up() {
        let cases = [
            (Point3::new(3.0, 2.0, 1.0), Point3::new(-1.0, 0.5, 2.0), Vector3::new(0.3, 2.0, -0.4)),
            (Point3::new(0.0, 10.0, 0.1), Point3::origin(), Vector3::new(0.0, 0.0, -7.0)),
            (Point3::new(-4.0, 1.0, -4.0), Point3::new(1.0, 1.0, 1.0), Vector3::new(1.0, 1.0, 0.0)),
        ];
        for (position, look_at, up) in cases {
            let eye = Eye::new(position, look_at, up).unwrap();
            assert_orthonormal(&eye);
        }
    }

    #[test]
    fn test_eye_rejects_parallel_up() {
        let result = Eye::new(Point3::new(0.0, 0.0, 5.0), Point3::origin(), Vector3::new(0.0, 0.0, 3.0));
        assert_eq!(result.unwrap_err(), SceneError::InvalidCameraBasis);
    }

    #[test]
    fn test_eye_rejects_zero_gaze_and_zero_up() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert_eq!(Eye::new(p, p, Vector3::y()).unwrap_err(), SceneError::InvalidCameraBasis);
        assert_eq!(
            Eye::new(p, Point3::origin(), Vector3::zeros()).unwrap_err(),
            SceneError::InvalidCameraBasis
        );
    }

    #[test]
    fn test_set_camera_rejection_keeps_previous() {
        let mut scene = Scene::new();
        scene.set_camera(Point3::new(0.0, 0.0, 5.0), Point3::origin(), Vector3::y()).unwrap();
        let before = *scene.camera();
        assert!(scene.set_camera(Point3::new(0.0, 5.0, 0.0), Point3::origin(), Vector3::y()).is_err());
        assert_eq!(*scene.camera(), before);
    }

    #[test]
    fn test_scene_defaults() {
        let scene = Scene::new();
        assert!(scene.spheres().is_empty());
        assert!(scene.lights().is_empty());
        assert_eq!(scene.background(), Color::BLACK);
        assert_eq!(scene.ambient(), Color::BLACK);
        assert!((scene.fov() - std::f64::consts::FRAC_PI_2).abs() < EPS);
        assert_eq!(*scene.camera(), Eye::default());
    }

    #[test]
    fn test_reset_scene_idempotent() {
        let mut scene = Scene::demo();
        assert!(!scene.spheres().is_empty());
        let camera = *scene.camera();

        scene.reset_scene();
        let once = scene.clone();
        scene.reset_scene();

        assert_eq!(scene, once);
        assert!(scene.spheres().is_empty());
        assert!(scene.lights().is_empty());
        assert_eq!(scene.background(), Color::BLACK);
        assert_eq!(scene.ambient(), Color::BLACK);
        assert_eq!(*scene.camera(), camera);
    }

    #[test]
    fn test_ambient_and_background_overwrite() {
        let mut scene = Scene::new();
        scene.set_ambient_light(Color::new(0.1, 0.2, 0.3)).unwrap();
        scene.set_ambient_light(Color::new(0.4, 0.5, 0.6)).unwrap();
        assert_eq!(scene.ambient(), Color::new(0.4, 0.5, 0.6));

        scene.set_background(Color::new(0.0, 1.0, 0.0)).unwrap();
        assert_eq!(scene.background(), Color::new(0.0, 1.0, 0.0));
        assert!(scene.set_background(Color::new(f64::NAN, 0.0, 0.0)).is_err());
        assert_eq!(scene.background(), Color::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_field_of_view_range() {
        let mut scene = Scene::new();
        scene.set_field_of_view(60.0).unwrap();
        assert!((scene.fov() - std::f64::consts::FRAC_PI_3).abs() < EPS);

        for bad in [0.0, -10.0, 180.0, 270.0, f64::NAN] {
            assert!(matches!(
                scene.set_field_of_view(bad),
                Err(SceneError::InvalidFieldOfView(_))
            ));
        }
        assert!((scene.fov() - std::f64::consts::FRAC_PI_3).abs() < EPS);
    }

    #[test]
    fn test_add_sphere_rejects_bad_radius() {
        let mut scene = Scene::new();
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = scene.add_sphere(Point3::origin(), radius, Color::WHITE, 0.2, 0.0, 1.0);
            assert!(matches!(result, Err(SceneError::InvalidRadius(_))));
        }
        assert!(scene.spheres().is_empty());

        scene.add_sphere(Point3::origin(), 0.5, Color::WHITE, 0.2, 0.0, 1.0).unwrap();
        assert_eq!(scene.spheres().len(), 1);
        assert_eq!(scene.spheres()[0].radius, 0.5);
    }

    #[test]
    fn test_add_light_appends_in_order() {
        let mut scene = Scene::new();
        for i in 0..5 {
            scene
                .add_light(Color::WHITE, Point3::new(i as f64, 0.0, 0.0))
                .unwrap();
        }
        assert_eq!(scene.lights().len(), 5);
        assert_eq!(scene.lights()[3].position.x, 3.0);
        assert!(scene.add_light(Color::WHITE, Point3::new(f64::INFINITY, 0.0, 0.0)).is_err());
        assert_eq!(scene.lights().len(), 5);
    }

    #[test]
    fn test_demo_scene_populated() {
        let scene = Scene::demo();
        assert_eq!(scene.spheres().len(), 3);
        assert_eq!(scene.lights().len(), 2);
    }

    #[test]
    fn test_scene_error_display() {
        assert!(SceneError::InvalidRadius(-2.0).to_string().contains("-2"));
        assert!(SceneError::InvalidFieldOfView(200.0).to_string().contains("200"));
        assert!(SceneError::InvalidCameraBasis.to_string().contains("camera"));
    }
}
