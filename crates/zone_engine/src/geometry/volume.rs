//! Placed convex volumes, the building blocks of a zone

use serde::{Deserialize, Serialize};

use super::aabb::AABB;
use super::shape::Shape;
use crate::error::{ZoneError, ZoneResult};
use crate::foundation::math::{Frame, Vec3};

/// A convex shape placed in the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Placement of the shape's local origin
    pub frame: Frame,
    /// Local-space shape
    pub shape: Shape,
}

impl Volume {
    /// Place `shape` at `frame`
    pub fn new(frame: Frame, shape: Shape) -> Self {
        Self { frame, shape }
    }

    /// Axis-aligned box of the given full size centred at `frame`
    pub fn cuboid(frame: Frame, size: Vec3) -> Self {
        Self::new(frame, Shape::cuboid(size))
    }

    /// Sphere centred at `center`
    pub fn ball(center: Vec3, radius: f32) -> Self {
        Self::new(Frame::from_position(center), Shape::ball(radius))
    }

    /// Reject non-finite placements and degenerate shapes
    pub fn validate(&self) -> ZoneResult<()> {
        if !self.frame.is_finite() {
            return Err(ZoneError::InvalidGeometry("volume frame is not finite".to_string()));
        }
        self.shape.validate()
    }

    /// World-space centre
    pub fn center(&self) -> Vec3 {
        self.frame.position
    }

    /// World-space bounds
    pub fn world_aabb(&self) -> AABB {
        self.shape.world_aabb(&self.frame)
    }

    /// Enclosed volume
    pub fn volume(&self) -> f32 {
        self.shape.volume()
    }

    /// Exact point-in-volume test, surface points count as inside
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.shape.contains_local_point(self.frame.inverse_transform_point(point))
    }

    /// Farthest world point along a world direction
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let local = self.frame.inverse_transform_vector(direction);
        self.frame.transform_point(self.shape.support_local(local))
    }
}
