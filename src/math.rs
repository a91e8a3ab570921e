//! Vector and color arithmetic

use std::ops::{Add, AddAssign, Mul};

/// 3-vector used for directions and offsets
pub type Vector3 = nalgebra::Vector3<f64>;

/// Position in world space
pub type Point3 = nalgebra::Point3<f64>;

/// Normalize a vector.
///
/// A zero-length input yields a vector with every component infinite rather
/// than NaN. Dot products against it are infinite or NaN, so callers in the
/// shading path must check [`is_degenerate`] before using the result.
#[inline]
pub fn normalize(v: Vector3) -> Vector3 {
    let mag = v.magnitude();
    if mag == 0.0 {
        Vector3::repeat(f64::INFINITY)
    } else {
        v / mag
    }
}

/// True if a vector carries a non-finite component (the zero-normalize sentinel
/// or anything derived from it)
#[inline]
pub fn is_degenerate(v: &Vector3) -> bool {
    !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite())
}

/// 8-bit display color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Unclamped RGB light intensity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    pub const GREY: Self = Self::new(0.5, 0.5, 0.5);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite()
    }

    /// Clamp each channel to [0, 1] and scale to [0, 255], truncating.
    /// NaN channels map to 0.
    pub fn to_drawing_color(&self) -> Rgb8 {
        fn legalize(d: f64) -> u8 {
            if d.is_nan() {
                return 0;
            }
            (d.clamp(0.0, 1.0) * 255.0).floor() as u8
        }
        Rgb8 {
            r: legalize(self.r),
            g: legalize(self.g),
            b: legalize(self.b),
        }
    }
}

impl From<[f64; 3]> for Color {
    fn from([r, g, b]: [f64; 3]) -> Self {
        Self { r, g, b }
    }
}

impl Add for Color {
    type Output = Color;

    fn add(self, rhs: Color) -> Color {
        Color::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        *self = *self + rhs;
    }
}

/// Scale by a scalar
impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, k: f64) -> Color {
        Color::new(self.r * k, self.g * k, self.b * k)
    }
}

impl Mul<Color> for f64 {
    type Output = Color;

    fn mul(self, c: Color) -> Color {
        c * self
    }
}

/// Component-wise product
impl Mul for Color {
    type Output = Color;

    fn mul(self, rhs: Color) -> Color {
        Color::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let v = normalize(Vector3::new(3.0, 4.0, 0.0));
        assert!((v.magnitude() - 1.0).abs() < 1e-12);
        assert!((v.x - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_zero_is_infinite_sentinel() {
        let v = normalize(Vector3::zeros());
        assert!(v.x.is_infinite() && v.y.is_infinite() && v.z.is_infinite());
        assert!(is_degenerate(&v));
        assert!(!is_degenerate(&Vector3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_cross_right_handed() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_color_arithmetic() {
        let a = Color::new(0.5, 1.0, 2.0);
        let b = Color::new(2.0, 0.5, 0.25);
        assert_eq!(a + b, Color::new(2.5, 1.5, 2.25));
        assert_eq!(a * b, Color::new(1.0, 0.5, 0.5));
        assert_eq!(a * 2.0, Color::new(1.0, 2.0, 4.0));
        assert_eq!(2.0 * a, a * 2.0);

        let mut acc = Color::BLACK;
        acc += a;
        acc += a;
        assert_eq!(acc, Color::new(1.0, 2.0, 4.0));
    }

    #[test]
    fn test_to_drawing_color_clamps_high() {
        let c = Color::new(1.0, 7.5, f64::INFINITY).to_drawing_color();
        assert_eq!(c, Rgb8::new(255, 255, 255));
    }

    #[test]
    fn test_to_drawing_color_truncates() {
        let c = Color::new(0.5, 0.0, 0.999).to_drawing_color();
        assert_eq!(c, Rgb8::new(127, 0, 254));
    }

    #[test]
    fn test_to_drawing_color_low_end_and_nan() {
        let c = Color::new(-0.3, f64::NAN, f64::NEG_INFINITY).to_drawing_color();
        assert_eq!(c, Rgb8::new(0, 0, 0));
    }
}
