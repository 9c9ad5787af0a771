//! Vector and transform primitives
//!
//! Rotation is always stored in radians (Euler XYZ). Anything facing a user
//! (property panel fields, bound `rotationX/Y/Z` values) is in degrees and is
//! converted at the boundary with [`rad_to_deg`] / [`deg_to_rad`].

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

/// A 3D vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Linear midpoint between two points
    pub fn midpoint(self, other: Vec3) -> Vec3 {
        Vec3::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    pub fn lerp(self, other: Vec3, t: f64) -> Vec3 {
        self + (other - self) * t
    }

    /// Component-wise comparison within `eps`
    pub fn approx_eq(self, other: Vec3, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Vec3 {
        Vec3::new(f(self.x), f(self.y), f(self.z))
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Position, Euler rotation (radians) and scale of a placed object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Rotation as UI degrees in [0, 360)
    pub fn rotation_degrees(&self) -> Vec3 {
        self.rotation.map(rad_to_deg)
    }

    pub fn set_rotation_degrees(&mut self, degrees: Vec3) {
        self.rotation = degrees.map(deg_to_rad);
    }
}

/// Radians to degrees, normalized to [0, 360)
pub fn rad_to_deg(rad: f64) -> f64 {
    let deg = (rad * 180.0 / PI) % 360.0;
    let deg = if deg < 0.0 { deg + 360.0 } else { deg };
    // -tiny + 360 rounds to exactly 360
    if deg >= 360.0 {
        deg - 360.0
    } else {
        deg
    }
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rad_to_deg_normalizes() {
        assert!((rad_to_deg(PI) - 180.0).abs() < 1e-9);
        assert!((rad_to_deg(-PI / 2.0) - 270.0).abs() < 1e-9);
        assert!((rad_to_deg(2.0 * PI)).abs() < 1e-9);
        assert!((rad_to_deg(5.0 * PI) - 180.0).abs() < 1e-9);

        let d = rad_to_deg(-1e-17);
        assert!((0.0..360.0).contains(&d));
    }

    #[test]
    fn test_degree_round_trip() {
        let mut t = Transform::default();
        t.set_rotation_degrees(Vec3::new(90.0, 45.0, 270.0));
        assert!((t.rotation.x - PI / 2.0).abs() < 1e-12);

        let back = t.rotation_degrees();
        assert!(back.approx_eq(Vec3::new(90.0, 45.0, 270.0), 1e-9));
    }

    #[test]
    fn test_midpoint() {
        let m = Vec3::new(-10.0, 0.0, 0.0).midpoint(Vec3::new(10.0, 4.0, 2.0));
        assert_eq!(m, Vec3::new(0.0, 2.0, 1.0));
    }
}
