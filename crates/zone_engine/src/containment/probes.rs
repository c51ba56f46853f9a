//! Probe lattices for sampled (bounds-level) containment

use super::levels::AccuracyLevel;
use super::narrow_phase::box_contains_point;
use crate::foundation::math::{Frame, Vec3};
use crate::geometry::Volume;

/// Lattice of world points spread over an oriented box, centre first
///
/// `n` points per axis from the accuracy level, running corner to corner,
/// so every level samples the box's extremes.
pub fn probe_points(frame: &Frame, half_extents: Vec3, accuracy: AccuracyLevel) -> Vec<Vec3> {
    let n = accuracy.probes_per_axis();
    let mut points = Vec::with_capacity(accuracy.probe_count());
    points.push(frame.position);

    let step = |i: usize| -1.0 + 2.0 * i as f32 / (n - 1) as f32;
    for ix in 0..n {
        for iy in 0..n {
            for iz in 0..n {
                let local = half_extents.component_mul(&Vec3::new(step(ix), step(iy), step(iz)));
                points.push(frame.transform_point(local));
            }
        }
    }
    points
}

/// Sampled overlap between an oriented box and one zone volume
///
/// A hit is any probe inside the volume, or the volume's centre inside
/// the box (a volume smaller than the probe spacing).
pub fn sampled_overlap(probes: &[Vec3], frame: &Frame, half_extents: Vec3, volume: &Volume) -> bool {
    probes.iter().any(|p| volume.contains_point(*p))
        || box_contains_point(frame, half_extents, volume.center())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_probe_counts_and_extremes() {
        let frame = Frame::at(1.0, 2.0, 3.0);
        let half = Vec3::new(1.0, 2.0, 3.0);
        for accuracy in AccuracyLevel::ALL {
            let points = probe_points(&frame, half, accuracy);
            assert_eq!(points.len(), accuracy.probe_count());
            assert_relative_eq!(points[0], frame.position);
            let max_x = points.iter().map(|p| p.x).fold(f32::MIN, f32::max);
            assert_relative_eq!(max_x, 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_small_volume_inside_box_is_found() {
        let frame = Frame::identity();
        let half = Vec3::new(10.0, 10.0, 10.0);
        let probes = probe_points(&frame, half, AccuracyLevel::Low);
        let tiny = Volume::ball(Vec3::new(1.0, 1.0, 1.0), 0.1);
        assert!(sampled_overlap(&probes, &frame, half, &tiny));
        let elsewhere = Volume::ball(Vec3::new(30.0, 0.0, 0.0), 0.1);
        assert!(!sampled_overlap(&probes, &frame, half, &elsewhere));
    }
}
