//! Spatial and common types
//!
//! Venue space is right-handed with Y up; the floor is the `y = 0` plane and
//! floor-plan coordinates are `(x, z)` in meters.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A 3D vector
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const ONE: Self = Self {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };
    pub const UP: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Project onto the floor plane
    pub fn floor(&self) -> FloorPoint {
        FloorPoint::new(self.x, self.z)
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

/// A point on the venue floor, `(x, z)` in meters
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloorPoint {
    pub x: f32,
    pub z: f32,
}

impl FloorPoint {
    pub const ORIGIN: Self = Self { x: 0.0, z: 0.0 };

    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Lift to 3D at the given height
    pub fn at_height(&self, y: f32) -> Vec3 {
        Vec3::new(self.x, y, self.z)
    }

    /// 2D cross product of `(a - self)` and `(b - self)`
    pub fn cross(&self, a: &Self, b: &Self) -> f32 {
        (a.x - self.x) * (b.z - self.z) - (a.z - self.z) * (b.x - self.x)
    }
}

impl Add for FloorPoint {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.z + other.z)
    }
}

impl Sub for FloorPoint {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.z - other.z)
    }
}

impl Mul<f32> for FloorPoint {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.z * scalar)
    }
}

/// A 3D transform with position, rotation (Euler angles), and scale
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation in radians (Euler angles, XYZ order)
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 transformation matrix (column-major)
    pub fn to_matrix(&self) -> [[f32; 4]; 4] {
        let (a, b) = (self.rotation.x.cos(), self.rotation.x.sin());
        let (c, d) = (self.rotation.y.cos(), self.rotation.y.sin());
        let (e, f) = (self.rotation.z.cos(), self.rotation.z.sin());
        let (ae, af, be, bf) = (a * e, a * f, b * e, b * f);

        // R = Rx * Ry * Rz, rows of the rotation block
        let (m00, m01, m02) = (c * e, -c * f, d);
        let (m10, m11, m12) = (af + be * d, ae - bf * d, -b * c);
        let (m20, m21, m22) = (bf - ae * d, be + af * d, a * c);

        [
            [m00 * self.scale.x, m10 * self.scale.x, m20 * self.scale.x, 0.0],
            [m01 * self.scale.y, m11 * self.scale.y, m21 * self.scale.y, 0.0],
            [m02 * self.scale.z, m12 * self.scale.z, m22 * self.scale.z, 0.0],
            [self.position.x, self.position.y, self.position.z, 1.0],
        ]
    }
}

/// Multiply two 4x4 column-major matrices
pub fn mat4_mul(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[k][j] * b[i][k];
            }
        }
    }
    result
}

/// RGBA color. Serialized as a `#rrggbb` / `#rrggbbaa` hex string.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Parse `rrggbb` or `rrggbbaa` hex strings, with an optional leading `#`
    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = s.trim().trim_start_matches('#');
        let value = u32::from_str_radix(digits, 16).ok()?;
        match digits.len() {
            6 => Some(Self::from_hex(value)),
            8 => Some(Self::from_hex(value >> 8).with_alpha((value & 0xFF) as f32 / 255.0)),
            _ => None,
        }
    }

    pub fn with_alpha(mut self, a: f32) -> Self {
        self.a = a;
        self
    }

    pub fn to_hex_string(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if (self.a - 1.0).abs() < f32::EPSILON {
            format!("#{:02x}{:02x}{:02x}", channel(self.r), channel(self.g), channel(self.b))
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                channel(self.r),
                channel(self.g),
                channel(self.b),
                channel(self.a)
            )
        }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Color::parse_hex(&value).ok_or_else(|| format!("invalid hex color '{}'", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex_string()
    }
}

/// Axis-aligned rectangle on the floor plane, stored as center + half extents
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub center: FloorPoint,
    pub half_x: f32,
    pub half_z: f32,
}

impl Rect {
    pub fn new(center: FloorPoint, half_x: f32, half_z: f32) -> Self {
        Self {
            center,
            half_x,
            half_z,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.center.x - self.half_x
    }

    pub fn max_x(&self) -> f32 {
        self.center.x + self.half_x
    }

    pub fn min_z(&self) -> f32 {
        self.center.z - self.half_z
    }

    pub fn max_z(&self) -> f32 {
        self.center.z + self.half_z
    }

    pub fn with_center(mut self, center: FloorPoint) -> Self {
        self.center = center;
        self
    }

    /// Overlap depth along each axis, or None if the rectangles are disjoint
    /// or only touch along an edge.
    pub fn overlap(&self, other: &Rect) -> Option<(f32, f32)> {
        let ox = self.max_x().min(other.max_x()) - self.min_x().max(other.min_x());
        let oz = self.max_z().min(other.max_z()) - self.min_z().max(other.min_z());
        if ox > 1e-5 && oz > 1e-5 {
            Some((ox, oz))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let v1 = Vec3::new(1.0, 2.0, 3.0);
        let v2 = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(v1 + v2, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(v2 - v1, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(v1 * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(v1.floor(), FloorPoint::new(1.0, 3.0));
    }

    #[test]
    fn test_transform_yaw_matrix() {
        let t = Transform::default()
            .with_position(Vec3::new(2.0, 0.0, 3.0))
            .with_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        let m = t.to_matrix();
        // +X rotated 90 degrees about Y points to -Z
        assert!(m[0][0].abs() < 1e-6);
        assert!((m[0][2] + 1.0).abs() < 1e-6);
        assert_eq!(m[3], [2.0, 0.0, 3.0, 1.0]);
    }

    #[test]
    fn test_color_hex_round_trip() {
        let c = Color::parse_hex("#ff8844").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert_eq!(c.to_hex_string(), "#ff8844");

        let translucent = Color::parse_hex("00ff0080").unwrap();
        assert!((translucent.a - 0.5).abs() < 0.01);
        assert!(Color::parse_hex("#12").is_none());
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect::new(FloorPoint::new(0.0, 0.0), 1.0, 1.0);
        let b = Rect::new(FloorPoint::new(1.5, 0.2), 1.0, 1.0);
        let (ox, oz) = a.overlap(&b).unwrap();
        assert!((ox - 0.5).abs() < 1e-6);
        assert!((oz - 1.8).abs() < 1e-6);

        let touching = Rect::new(FloorPoint::new(2.0, 0.0), 1.0, 1.0);
        assert!(a.overlap(&touching).is_none());
    }
}
