//! # Zone Engine
//!
//! Spatial zones for game worlds: decides which parts, characters and
//! players are inside a set of convex volumes and publishes an event each
//! time one of them crosses a zone boundary.
//!
//! ## Features
//!
//! - **Convex geometry**: boxes, balls and convex hulls, with derived region
//!   and additive volume
//! - **Tiered detection**: centroid, sampled bounds or exact overlap,
//!   chosen separately for entering and exiting
//! - **Debounced updates**: bursts of geometry changes collapse into one
//!   evaluation per update window
//! - **Exclusive groups**: bordering zones never both claim one occupant
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zone_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut zones = ZoneController::new(EngineConfig::default())?;
//!     let area = zones.create_zone_from_region("area", Frame::identity(), Vec3::new(10.0, 10.0, 10.0))?;
//!     let crate_part = zones.spawn_part(Part::block("crate", Frame::at(100.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)));
//!     zones.track_item(area, crate_part)?;
//!
//!     zones.move_entity(crate_part, Frame::identity())?;
//!     let report = zones.step(1.0);
//!     for event in &report.events {
//!         println!("{:?}", event.kind);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod containment;
pub mod controller;
pub mod error;
pub mod events;
pub mod foundation;
pub mod geometry;
pub mod group;
pub mod scene;
pub mod scheduler;
pub mod spatial;
pub mod tracker;
pub mod zone;

#[cfg(test)]
mod tests;

pub use controller::{PairError, StepReport, ZoneController};
pub use error::{ZoneError, ZoneResult};
pub use zone::Zone;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EngineConfig, ZoneOptions},
        containment::{AccuracyLevel, Containment, DetectionLevel, Query},
        events::{Occupant, TrackerEvent, TrackerEventKind, ZoneEvent, ZoneEventKind},
        foundation::{
            collections::{EntityId, PlayerId, ZoneId},
            math::{Frame, Quat, Vec3},
        },
        geometry::{Shape, Volume, ZoneGeometry, AABB},
        group::GroupSettings,
        scene::{Body, Character, Part},
        spatial::{SpatialQuery, QueryFilter},
        PairError, StepReport, Zone, ZoneController, ZoneError, ZoneResult,
    };
}
