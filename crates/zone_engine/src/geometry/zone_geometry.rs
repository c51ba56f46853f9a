//! Captured zone geometry: ordered volumes plus derived region and volume

use super::aabb::AABB;
use super::volume::Volume;
use crate::error::{ZoneError, ZoneResult};
use crate::foundation::math::{Frame, Vec3};

/// Most cells [`ZoneGeometry::from_region`] will generate
pub const MAX_REGION_CELLS: u64 = 4096;

/// Ordered set of convex volumes with derived bounds
///
/// `volume` is the plain sum of the member volumes; overlap between members
/// is counted twice.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneGeometry {
    volumes: Vec<Volume>,
    region: AABB,
    volume: f32,
}

impl ZoneGeometry {
    /// Capture geometry from a list of volumes
    ///
    /// Fails on an empty list or on any degenerate volume. Capturing the same
    /// list twice yields identical region and volume.
    pub fn capture(volumes: Vec<Volume>) -> ZoneResult<Self> {
        if volumes.is_empty() {
            return Err(ZoneError::InvalidGeometry("zone needs at least one volume".to_string()));
        }
        for (index, volume) in volumes.iter().enumerate() {
            volume.validate().map_err(|err| match err {
                ZoneError::InvalidGeometry(reason) => {
                    ZoneError::InvalidGeometry(format!("volume {index}: {reason}"))
                }
                other => other,
            })?;
        }

        let region = volumes
            .iter()
            .map(Volume::world_aabb)
            .reduce(|acc, aabb| acc.union(&aabb))
            .ok_or_else(|| ZoneError::InvalidGeometry("zone needs at least one volume".to_string()))?;
        let volume = volumes.iter().map(Volume::volume).sum();

        Ok(Self { volumes, region, volume })
    }

    /// Build geometry from a single oriented box
    ///
    /// Any axis longer than `max_part_size` is split into equal cells so
    /// that no generated volume exceeds the ceiling. Fails when that would
    /// take more than [`MAX_REGION_CELLS`] cells.
    pub fn from_region(frame: Frame, size: Vec3, max_part_size: f32) -> ZoneResult<Self> {
        if !(max_part_size.is_finite() && max_part_size > 0.0) {
            return Err(ZoneError::InvalidGeometry(format!(
                "part size ceiling must be positive, got {max_part_size}"
            )));
        }
        if !size.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(ZoneError::InvalidGeometry(format!(
                "region size must be positive and finite, got {size:?}"
            )));
        }

        let cells = size.map(|s| (s / max_part_size).ceil().max(1.0));
        // Saturating casts keep absurd ratios above the cap instead of wrapping
        let total = cells.iter().fold(1u64, |acc, c| acc.saturating_mul(*c as u64));
        if total > MAX_REGION_CELLS {
            return Err(ZoneError::InvalidGeometry(format!(
                "region {size:?} at part size {max_part_size} needs {total} cells, at most {MAX_REGION_CELLS} allowed"
            )));
        }
        let cell_size = size.component_div(&cells);
        let mut volumes = Vec::new();

        // Counts are small positive integers stored as floats
        for ix in 0..cells.x as u32 {
            for iy in 0..cells.y as u32 {
                for iz in 0..cells.z as u32 {
                    let index = Vec3::new(ix as f32, iy as f32, iz as f32);
                    let local = -size * 0.5 + cell_size.component_mul(&index.add_scalar(0.5));
                    volumes.push(Volume::cuboid(frame.translated_local(local), cell_size));
                }
            }
        }

        Self::capture(volumes)
    }

    /// Volumes in insertion order
    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    /// Number of volumes
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Captured geometry always has at least one volume
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Bounding region covering every volume
    pub fn region(&self) -> AABB {
        self.region
    }

    /// Additive volume
    pub fn volume(&self) -> f32 {
        self.volume
    }
}

/// Bounding region of captured geometry
pub fn region_of(geometry: &ZoneGeometry) -> AABB {
    geometry.region()
}

/// Additive volume of captured geometry
pub fn volume_of(geometry: &ZoneGeometry) -> f32 {
    geometry.volume()
}
