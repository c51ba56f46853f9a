//! Axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

use crate::foundation::math::{abs_matrix, Frame, Vec3};

/// World-axis box, used for zone regions and broad-phase bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Low corner
    pub min: Vec3,
    /// High corner
    pub max: Vec3,
}

impl AABB {
    /// Box spanning two corners
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box around `center` reaching `extents` along each axis
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self::new(center - extents, center + extents)
    }

    /// World-space bounds of a box with the given half extents placed at `frame`
    pub fn from_oriented_box(frame: &Frame, half_extents: Vec3) -> Self {
        // Projected radius along each world axis is |R| * h
        let world_extents = abs_matrix(&frame.basis()) * half_extents;
        Self::from_center_extents(frame.position, world_extents)
    }

    /// Smallest AABB covering every point; `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |acc, p| {
            Self::new(acc.min.inf(&p), acc.max.sup(&p))
        }))
    }

    /// Midpoint
    pub fn center(&self) -> Vec3 {
        self.min.lerp(&self.max, 0.5)
    }

    /// Half of [`size`](Self::size)
    pub fn extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Full edge lengths
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Enclosed volume
    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Whether `point` lies inside or on the boundary
    pub fn contains_point(&self, point: Vec3) -> bool {
        (point - self.min).min() >= 0.0 && (self.max - point).min() >= 0.0
    }

    /// Whether `other` lies completely inside
    pub fn contains_aabb(&self, other: &AABB) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Whether the boxes overlap; touching faces count
    pub fn intersects(&self, other: &AABB) -> bool {
        (other.max - self.min).min() >= 0.0 && (self.max - other.min).min() >= 0.0
    }

    /// Smallest AABB covering both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Grow the box by `margin` on every side
    pub fn expanded(&self, margin: f32) -> AABB {
        let m = Vec3::new(margin, margin, margin);
        AABB::new(self.min - m, self.max + m)
    }
}
