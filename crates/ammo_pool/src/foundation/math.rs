//! Math utilities and types
//!
//! Provides the 2D math types used by the pool, the physics backend and the
//! emission driver.

pub use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Rigid 2D transform: position plus rotation (radians, counter-clockwise from +X)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// Position in world space
    pub position: Vec2,

    /// Rotation in radians
    pub rotation: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2D {
    /// Create a new transform
    pub const fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    /// Create the identity transform (origin, no rotation)
    pub fn identity() -> Self {
        Self {
            position: Vec2::zeros(),
            rotation: 0.0,
        }
    }

    /// Create a transform with only position
    pub const fn from_position(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
        }
    }

    /// Unit vector the transform is facing
    pub fn forward(&self) -> Vec2 {
        direction_from_angle(self.rotation)
    }

    /// Linear interpolation between two transforms
    ///
    /// Rotation takes the shortest arc.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let delta = wrap_angle(other.rotation - self.rotation);
        Self {
            position: self.position.lerp(&other.position, t),
            rotation: self.rotation + delta * t,
        }
    }

    /// Check whether all components are finite
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite()) && self.rotation.is_finite()
    }
}

/// Unit vector for an angle in radians
pub fn direction_from_angle(radians: f32) -> Vec2 {
    Vec2::new(radians.cos(), radians.sin())
}

/// Angle in radians of a (non-zero) vector
pub fn angle_of(vector: &Vec2) -> f32 {
    vector.y.atan2(vector.x)
}

/// Rotate a vector by an angle in radians
pub fn rotate(vector: &Vec2, radians: f32) -> Vec2 {
    Rotation2::new(radians) * vector
}

/// Wrap an angle into `(-PI, PI]`
pub fn wrap_angle(radians: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (radians + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Normalize a vector, returning `None` for (near-)zero length
pub fn try_normalize(vector: &Vec2) -> Option<Vec2> {
    vector.try_normalize(f32::EPSILON)
}
