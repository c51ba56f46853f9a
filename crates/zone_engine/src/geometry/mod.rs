//! Zone geometry model
//!
//! Zones are ordered sets of convex [`Volume`]s. [`ZoneGeometry`] captures
//! such a set together with its derived bounding region and additive volume.

mod aabb;
mod hull;
mod shape;
mod volume;
mod zone_geometry;

pub use aabb::AABB;
pub use hull::{ConvexHull, HullPlane, MAX_HULL_VERTICES};
pub use shape::Shape;
pub use volume::Volume;
pub use zone_geometry::{region_of, volume_of, ZoneGeometry, MAX_REGION_CELLS};
