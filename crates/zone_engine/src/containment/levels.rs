//! Precision tiers for containment tests

use serde::{Deserialize, Serialize};

/// Probe density for non-exact tests, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccuracyLevel {
    /// Box corners and centre
    Low,
    /// 3x3x3 lattice
    Medium,
    /// 4x4x4 lattice
    High,
    /// 5x5x5 lattice
    Precise,
}

impl AccuracyLevel {
    /// All levels in ascending cost
    pub const ALL: [AccuracyLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Precise];

    /// Lattice points per axis across the query's extents
    pub fn probes_per_axis(self) -> usize {
        match self {
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
            Self::Precise => 5,
        }
    }

    /// Total probes cast per query box (lattice plus centre)
    pub fn probe_count(self) -> usize {
        self.probes_per_axis().pow(3) + 1
    }
}

impl Default for AccuracyLevel {
    fn default() -> Self {
        Self::High
    }
}

/// What "inside" means for an entity with extents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionLevel {
    /// Centroid for zones much larger than the tracked set, exact otherwise
    Automatic,
    /// Only the entity's centre (a character's root) is tested
    Centroid,
    /// The entity's oriented extents overlap a volume; probes refine hull volumes
    Bounds,
    /// Full convex overlap of every detection part
    Exact,
}

impl Default for DetectionLevel {
    fn default() -> Self {
        Self::Automatic
    }
}

impl DetectionLevel {
    /// Replace `Automatic` with a concrete level
    ///
    /// Large zones relative to the combined tracked volume only need the
    /// centre of each entity; small ones need the whole body.
    pub fn resolve(self, zone_volume: f32, tracked_volume: f32, ratio: f32) -> DetectionLevel {
        match self {
            Self::Automatic => {
                if zone_volume > tracked_volume * ratio {
                    Self::Centroid
                } else {
                    Self::Exact
                }
            }
            level => level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_order_matches_cost() {
        let counts: Vec<usize> = AccuracyLevel::ALL.iter().map(|a| a.probe_count()).collect();
        assert!(counts.windows(2).all(|w| w[0] < w[1]));
        assert!(AccuracyLevel::Low < AccuracyLevel::Precise);
    }

    #[test]
    fn test_automatic_resolution() {
        assert_eq!(DetectionLevel::Automatic.resolve(1000.0, 10.0, 8.0), DetectionLevel::Centroid);
        assert_eq!(DetectionLevel::Automatic.resolve(50.0, 10.0, 8.0), DetectionLevel::Exact);
        assert_eq!(DetectionLevel::Bounds.resolve(1000.0, 10.0, 8.0), DetectionLevel::Bounds);
    }
}
