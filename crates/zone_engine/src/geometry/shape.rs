//! Convex shape primitives stored in local space
//!
//! Shapes carry no placement; a [`Frame`] positions them in the world at
//! test time, so a moved part only swaps its frame.

use serde::{Deserialize, Serialize};

use super::aabb::AABB;
use super::hull::ConvexHull;
use crate::error::{ZoneError, ZoneResult};
use crate::foundation::math::{Frame, Vec3, EPSILON};

/// Convex shape types (stored in LOCAL SPACE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Box centred on the frame origin
    Cuboid {
        /// Half of the edge lengths along the local axes
        half_extents: Vec3,
    },
    /// Sphere centred on the frame origin
    Ball {
        /// Sphere radius
        radius: f32,
    },
    /// Arbitrary convex polyhedron
    Hull(ConvexHull),
}

impl Shape {
    /// Box from its full edge lengths
    pub fn cuboid(size: Vec3) -> Self {
        Self::Cuboid { half_extents: size * 0.5 }
    }

    /// Sphere of the given radius
    pub fn ball(radius: f32) -> Self {
        Self::Ball { radius }
    }

    /// Convex hull around the given local vertices
    pub fn hull(vertices: Vec<Vec3>) -> ZoneResult<Self> {
        ConvexHull::new(vertices).map(Self::Hull)
    }

    /// Reject shapes with no interior or non-finite dimensions
    pub fn validate(&self) -> ZoneResult<()> {
        match self {
            Self::Cuboid { half_extents } => {
                if half_extents.iter().all(|h| h.is_finite() && *h > 0.0) {
                    Ok(())
                } else {
                    Err(ZoneError::InvalidGeometry(format!(
                        "box size must be positive and finite, got {:?}",
                        half_extents * 2.0
                    )))
                }
            }
            Self::Ball { radius } => {
                if radius.is_finite() && *radius > 0.0 {
                    Ok(())
                } else {
                    Err(ZoneError::InvalidGeometry(format!(
                        "sphere radius must be positive and finite, got {radius}"
                    )))
                }
            }
            // Hulls are validated when they are built
            Self::Hull(_) => Ok(()),
        }
    }

    /// Enclosed volume
    pub fn volume(&self) -> f32 {
        match self {
            Self::Cuboid { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            Self::Ball { radius } => 4.0 / 3.0 * std::f32::consts::PI * radius.powi(3),
            Self::Hull(hull) => hull.volume(),
        }
    }

    /// Half extents of the local bounding box
    pub fn local_half_extents(&self) -> Vec3 {
        match self {
            Self::Cuboid { half_extents } => *half_extents,
            Self::Ball { radius } => Vec3::new(*radius, *radius, *radius),
            Self::Hull(hull) => hull.local_half_extents(),
        }
    }

    /// Full local bounding size, the "Size" of a part
    pub fn size(&self) -> Vec3 {
        self.local_half_extents() * 2.0
    }

    /// Local point inside or on the surface
    pub fn contains_local_point(&self, point: Vec3) -> bool {
        match self {
            Self::Cuboid { half_extents } => {
                point.x.abs() <= half_extents.x + EPSILON
                    && point.y.abs() <= half_extents.y + EPSILON
                    && point.z.abs() <= half_extents.z + EPSILON
            }
            Self::Ball { radius } => point.norm_squared() <= (radius + EPSILON) * (radius + EPSILON),
            Self::Hull(hull) => hull.contains_point(point),
        }
    }

    /// Farthest local point along a local direction
    pub fn support_local(&self, direction: Vec3) -> Vec3 {
        match self {
            Self::Cuboid { half_extents } => Vec3::new(
                half_extents.x.copysign(direction.x),
                half_extents.y.copysign(direction.y),
                half_extents.z.copysign(direction.z),
            ),
            Self::Ball { radius } => {
                let length = direction.norm();
                if length <= f32::EPSILON {
                    Vec3::new(*radius, 0.0, 0.0)
                } else {
                    direction * (*radius / length)
                }
            }
            Self::Hull(hull) => hull.support(direction),
        }
    }

    /// World-space bounds when placed at `frame`
    pub fn world_aabb(&self, frame: &Frame) -> AABB {
        match self {
            Self::Ball { radius } => {
                AABB::from_center_extents(frame.position, Vec3::new(*radius, *radius, *radius))
            }
            Self::Hull(hull) => {
                AABB::from_points(hull.vertices().iter().map(|v| frame.transform_point(*v)))
                    .unwrap_or_else(|| AABB::from_center_extents(frame.position, Vec3::zeros()))
            }
            Self::Cuboid { half_extents } => AABB::from_oriented_box(frame, *half_extents),
        }
    }
}
