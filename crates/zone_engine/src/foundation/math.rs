//! Math utilities and types
//!
//! Provides the vector aliases and the rigid [`Frame`] used to place zone
//! volumes and scene parts in world space.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Tolerance used by the geometric tests
pub const EPSILON: f32 = 1.0e-5;

/// Rigid placement: a position and an orientation, no scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position in world space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

impl Frame {
    /// Create a new identity frame
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a frame with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a frame with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Convenience constructor from coordinates
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self::from_position(Vec3::new(x, y, z))
    }

    /// Rotation as a matrix whose columns are the frame's local axes
    pub fn basis(&self) -> Mat3 {
        *self.rotation.to_rotation_matrix().matrix()
    }

    /// Map a local point into world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Map a local direction into world space
    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// Map a world point into this frame's local space
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }

    /// Map a world direction into this frame's local space
    pub fn inverse_transform_vector(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * world
    }

    /// Combine this frame with a frame expressed relative to it
    pub fn combine(&self, local: &Frame) -> Frame {
        Frame {
            position: self.transform_point(local.position),
            rotation: self.rotation * local.rotation,
        }
    }

    /// Offset this frame along its own axes
    pub fn translated_local(&self, offset: Vec3) -> Frame {
        Frame {
            position: self.transform_point(offset),
            rotation: self.rotation,
        }
    }

    /// Whether position and rotation are free of NaN and infinity
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.rotation.coords.iter().all(|c| c.is_finite())
    }
}

/// Component-wise `|x|` of a matrix, used to project boxes onto world axes
pub fn abs_matrix(m: &Mat3) -> Mat3 {
    m.map(f32::abs)
}
