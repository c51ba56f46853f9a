//! Spatial partitioning data structures
//!
//! Provides the broad-phase adapter the zone engine uses to find
//! candidate entities inside a zone's region.

mod octree;
pub mod spatial_query;

pub use octree::{Octree, OctreeConfig, OctreeEntry};
pub use spatial_query::{EntityKinds, OctreeSpatialQuery, QueryFilter, SpatialQuery};
