//! A minimal 2D vector used for every position calculation in the engine:
//! state positions, control points and the drag offsets derived from them.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Neg, Sub};

/// The direction returned when a zero-length vector has to be normalized.
/// Points "up" in screen coordinates (y grows downwards).
pub const DEFAULT_DIRECTION: Vector = Vector { x: 0.0, y: -1.0 };

/// A position or displacement on the canvas. Serialized as `{ "x": .., "y": .. }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the length of this vector.
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Returns a unit vector sharing this vector's direction.
    ///
    /// A zero-length vector has no direction; [`DEFAULT_DIRECTION`] is returned instead.
    pub fn normalize(&self) -> Vector {
        let len = self.magnitude();
        if len == 0.0 || !len.is_finite() {
            return DEFAULT_DIRECTION;
        }
        Vector::new(self.x / len, self.y / len)
    }

    /// Returns this vector rotated 90 degrees clockwise (screen coordinates),
    /// keeping its length.
    pub fn perp(&self) -> Vector {
        Vector::new(-self.y, self.x)
    }

    /// Unit vector perpendicular to this one. Used as the "bulge" direction of
    /// a curve whose chord is `self`.
    pub fn unit_normal(&self) -> Vector {
        self.perp().normalize()
    }

    pub fn scale(&self, factor: f64) -> Vector {
        Vector::new(self.x * factor, self.y * factor)
    }

    pub fn dot(&self, v: Vector) -> f64 {
        self.x * v.x + self.y * v.y
    }

    /// Projects this vector onto `v`. Projecting onto a zero vector yields zero.
    pub fn project(&self, v: Vector) -> Vector {
        let denom = v.dot(v);
        if denom == 0.0 {
            return Vector::ZERO;
        }
        v.scale(self.dot(v) / denom)
    }

    pub fn distance(&self, v: Vector) -> f64 {
        (*self - v).magnitude()
    }

    /// Approximate equality, used by tests and by gesture bookkeeping.
    pub fn approx_eq(&self, v: Vector, epsilon: f64) -> bool {
        (self.x - v.x).abs() <= epsilon && (self.y - v.y).abs() <= epsilon
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, v: Vector) -> Vector {
        Vector::new(self.x + v.x, self.y + v.y)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, v: Vector) -> Vector {
        Vector::new(self.x - v.x, self.y - v.y)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}
