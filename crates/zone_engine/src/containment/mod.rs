//! Containment engine: is a point, part or character inside a zone?
//!
//! Every test runs against a captured [`ZoneGeometry`] and reports which of
//! its volumes matched. The zone's region acts as the first reject; each
//! volume's own bounds act as the second.

mod levels;
pub mod narrow_phase;
pub mod probes;

pub use levels::{AccuracyLevel, DetectionLevel};

use crate::error::{ZoneError, ZoneResult};
use crate::foundation::math::{Frame, Vec3};
use crate::geometry::{Shape, Volume, ZoneGeometry};
use crate::scene::{Body, Character, Part};

use narrow_phase::{overlaps, ConvexRef};

/// What is being tested against a zone
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    /// A bare world point
    Point(Vec3),
    /// A rigid part
    Part(&'a Part),
    /// An articulated character
    Character(&'a Character),
}

impl<'a> From<&'a Body> for Query<'a> {
    fn from(body: &'a Body) -> Self {
        match body {
            Body::Part(part) => Query::Part(part),
            Body::Character(character) => Query::Character(character),
        }
    }
}

impl Query<'_> {
    /// Centre used by centroid detection: the part's position or the
    /// character's root
    pub fn centroid(&self) -> ZoneResult<Vec3> {
        let point = match self {
            Query::Point(point) => *point,
            Query::Part(part) => part.frame.position,
            Query::Character(character) => {
                character
                    .root()
                    .ok_or_else(|| {
                        ZoneError::InvalidQuery(format!("character '{}' has no root part", character.name))
                    })?
                    .frame
                    .position
            }
        };
        if point.iter().all(|c| c.is_finite()) {
            Ok(point)
        } else {
            Err(ZoneError::InvalidQuery("non-finite position".to_string()))
        }
    }

    /// Derived oriented box of the query
    fn bounding_box(&self) -> ZoneResult<(Frame, Vec3)> {
        match self {
            Query::Point(point) => Ok((Frame::from_position(*point), Vec3::zeros())),
            Query::Part(part) => Ok((part.frame, part.shape.local_half_extents())),
            Query::Character(character) => character
                .size_and_frame()
                .map(|(size, frame)| (frame, size / 2.0))
                .ok_or_else(|| {
                    ZoneError::InvalidQuery(format!("character '{}' is missing its root or head", character.name))
                }),
        }
    }

    /// Oriented boxes tested by bounds detection
    ///
    /// A character contributes its derived box plus the box of every limb
    /// exact tests would look at, so the boxes always cover the body.
    fn extent_boxes(&self) -> ZoneResult<Vec<(Frame, Shape)>> {
        let (frame, half_extents) = self.bounding_box()?;
        let mut boxes = vec![(frame, Shape::Cuboid { half_extents })];
        if let Query::Character(character) = self {
            self.centroid()?;
            boxes.extend(
                character
                    .detection_parts()
                    .map(|p| (p.frame, Shape::Cuboid { half_extents: p.shape.local_half_extents() })),
            );
        }
        Ok(boxes)
    }
}

/// Outcome of one containment test
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Containment {
    /// Whether the query is inside the zone at the requested precision
    pub inside: bool,
    /// Indices of matched volumes in the zone's volume list, ascending
    pub volumes: Vec<usize>,
}

impl Containment {
    /// Not inside any volume
    pub fn outside() -> Self {
        Self::default()
    }

    fn from_volumes(volumes: Vec<usize>) -> Self {
        Self {
            inside: !volumes.is_empty(),
            volumes,
        }
    }
}

/// Test `query` against `geometry`
///
/// `Automatic` should be resolved by the caller through
/// [`DetectionLevel::resolve`]; if it reaches here it is treated as exact.
/// Points ignore the detection level, they have no extents to sample.
pub fn contains(
    query: Query<'_>,
    geometry: &ZoneGeometry,
    detection: DetectionLevel,
    accuracy: AccuracyLevel,
) -> ZoneResult<Containment> {
    if let Query::Point(point) = query {
        return contains_point(geometry, point);
    }
    match detection {
        DetectionLevel::Centroid => contains_point(geometry, query.centroid()?),
        DetectionLevel::Bounds => contains_bounds(query, geometry, accuracy),
        DetectionLevel::Exact | DetectionLevel::Automatic => contains_exact(query, geometry),
    }
}

/// Exact point test against every volume
pub fn contains_point(geometry: &ZoneGeometry, point: Vec3) -> ZoneResult<Containment> {
    if !point.iter().all(|c| c.is_finite()) {
        return Err(ZoneError::InvalidQuery("non-finite point".to_string()));
    }
    if !geometry.region().contains_point(point) {
        return Ok(Containment::outside());
    }
    let volumes = geometry
        .volumes()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.world_aabb().contains_point(point) && v.contains_point(point))
        .map(|(i, _)| i)
        .collect();
    Ok(Containment::from_volumes(volumes))
}

fn contains_bounds(query: Query<'_>, geometry: &ZoneGeometry, accuracy: AccuracyLevel) -> ZoneResult<Containment> {
    let boxes = query.extent_boxes()?;
    let pieces = boxes.iter().map(|(frame, shape)| ConvexRef::new(frame, shape));

    // Hull overlap goes through GJK; probes back it up at the chosen accuracy
    overlapping_volumes(geometry, pieces, |piece, volume| {
        let (Shape::Hull(_), Shape::Cuboid { half_extents }) = (&volume.shape, piece.shape) else {
            return false;
        };
        let probes = probes::probe_points(piece.frame, *half_extents, accuracy);
        probes::sampled_overlap(&probes, piece.frame, *half_extents, volume)
    })
}

fn contains_exact(query: Query<'_>, geometry: &ZoneGeometry) -> ZoneResult<Containment> {
    let character_box;
    let pieces: Vec<ConvexRef<'_>> = match query {
        Query::Point(point) => return contains_point(geometry, point),
        Query::Part(part) => vec![ConvexRef::new(&part.frame, &part.shape)],
        Query::Character(character) => {
            query.centroid()?;
            let parts: Vec<_> = character.detection_parts().map(|p| ConvexRef::new(&p.frame, &p.shape)).collect();
            if parts.is_empty() {
                let (frame, half_extents) = query.bounding_box()?;
                character_box = (frame, Shape::Cuboid { half_extents });
                vec![ConvexRef::new(&character_box.0, &character_box.1)]
            } else {
                parts
            }
        }
    };
    overlapping_volumes(geometry, pieces, |_, _| false)
}

/// Volumes touched by any piece, by narrow-phase overlap or `also_matches`
fn overlapping_volumes<'q>(
    geometry: &ZoneGeometry,
    pieces: impl IntoIterator<Item = ConvexRef<'q>>,
    mut also_matches: impl FnMut(&ConvexRef<'q>, &Volume) -> bool,
) -> ZoneResult<Containment> {
    let region = geometry.region();
    let mut matched = vec![false; geometry.len()];
    for piece in pieces {
        if !piece.frame.is_finite() {
            return Err(ZoneError::InvalidQuery("non-finite frame".to_string()));
        }
        let bounds = piece.shape.world_aabb(piece.frame);
        if !bounds.intersects(&region) {
            continue;
        }
        for (index, volume) in geometry.volumes().iter().enumerate() {
            if matched[index] || !volume.world_aabb().intersects(&bounds) {
                continue;
            }
            matched[index] = overlaps(piece, ConvexRef::from(volume)) || also_matches(&piece, volume);
        }
    }

    let volumes = matched
        .iter()
        .enumerate()
        .filter(|(_, hit)| **hit)
        .map(|(i, _)| i)
        .collect();
    Ok(Containment::from_volumes(volumes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ROOT_PART;

    fn ten_cube() -> ZoneGeometry {
        ZoneGeometry::capture(vec![Volume::cuboid(Frame::identity(), Vec3::new(10.0, 10.0, 10.0))]).unwrap()
    }

    fn all_levels() -> [DetectionLevel; 3] {
        [DetectionLevel::Centroid, DetectionLevel::Bounds, DetectionLevel::Exact]
    }

    #[test]
    fn test_point_inside_and_outside() {
        let zone = ten_cube();
        let inside = contains(Query::Point(Vec3::zeros()), &zone, DetectionLevel::Exact, AccuracyLevel::High).unwrap();
        assert_eq!(inside, Containment { inside: true, volumes: vec![0] });
        let outside =
            contains(Query::Point(Vec3::new(6.0, 0.0, 0.0)), &zone, DetectionLevel::Exact, AccuracyLevel::High).unwrap();
        assert!(!outside.inside);
        assert!(outside.volumes.is_empty());
    }

    #[test]
    fn test_non_finite_point_is_invalid() {
        let zone = ten_cube();
        let result = contains(Query::Point(Vec3::new(f32::NAN, 0.0, 0.0)), &zone, DetectionLevel::Exact, AccuracyLevel::High);
        assert!(matches!(result, Err(ZoneError::InvalidQuery(_))));
    }

    #[test]
    fn test_part_straddling_boundary_by_level() {
        let zone = ten_cube();
        // Centre outside, but the part reaches 1.5 studs into the zone
        let part = Part::block("plank", Frame::at(6.0, 0.0, 0.0), Vec3::new(5.0, 1.0, 1.0));
        let centroid = contains(Query::Part(&part), &zone, DetectionLevel::Centroid, AccuracyLevel::High).unwrap();
        let bounds = contains(Query::Part(&part), &zone, DetectionLevel::Bounds, AccuracyLevel::High).unwrap();
        let exact = contains(Query::Part(&part), &zone, DetectionLevel::Exact, AccuracyLevel::High).unwrap();
        assert!(!centroid.inside);
        assert!(bounds.inside);
        assert!(exact.inside);
    }

    #[test]
    fn test_far_part_outside_at_every_level() {
        let zone = ten_cube();
        let part = Part::block("crate", Frame::at(100.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        for level in all_levels() {
            let result = contains(Query::Part(&part), &zone, level, AccuracyLevel::Low).unwrap();
            assert!(!result.inside, "{level:?}");
        }
    }

    #[test]
    fn test_matched_volume_indices() {
        let zone = ZoneGeometry::capture(vec![
            Volume::cuboid(Frame::at(-5.0, 0.0, 0.0), Vec3::new(4.0, 4.0, 4.0)),
            Volume::cuboid(Frame::at(5.0, 0.0, 0.0), Vec3::new(4.0, 4.0, 4.0)),
            Volume::ball(Vec3::new(0.0, 20.0, 0.0), 2.0),
        ])
        .unwrap();
        let wide = Part::block("beam", Frame::identity(), Vec3::new(12.0, 1.0, 1.0));
        let exact = contains(Query::Part(&wide), &zone, DetectionLevel::Exact, AccuracyLevel::High).unwrap();
        assert_eq!(exact.volumes, vec![0, 1]);
        // The gap between the two boxes holds the centre
        let centroid = contains(Query::Part(&wide), &zone, DetectionLevel::Centroid, AccuracyLevel::High).unwrap();
        assert!(!centroid.inside);
    }

    #[test]
    fn test_character_levels() {
        let zone = ten_cube();
        let inside = Character::humanoid("hero", Frame::identity());
        for level in all_levels() {
            assert!(contains(Query::Character(&inside), &zone, level, AccuracyLevel::High).unwrap().inside);
        }
        // Root just outside the +X face, left arm reaching back in
        let edge = Character::humanoid("hero", Frame::at(6.2, 0.0, 0.0));
        assert!(!contains(Query::Character(&edge), &zone, DetectionLevel::Centroid, AccuracyLevel::High).unwrap().inside);
        assert!(contains(Query::Character(&edge), &zone, DetectionLevel::Exact, AccuracyLevel::High).unwrap().inside);
    }

    #[test]
    fn test_character_without_root_is_invalid() {
        let zone = ten_cube();
        let headless = Character::new("ghost", vec![Part::block("LeftArm", Frame::identity(), Vec3::new(1.0, 2.0, 1.0))]);
        for level in all_levels() {
            let result = contains(Query::Character(&headless), &zone, level, AccuracyLevel::High);
            assert!(matches!(result, Err(ZoneError::InvalidQuery(_))), "{level:?}");
        }
    }

    #[test]
    fn test_character_with_only_ignored_parts_uses_box() {
        let zone = ten_cube();
        let character = Character::new(
            "stub",
            vec![
                Part::block(ROOT_PART, Frame::at(6.5, 0.0, 0.0), Vec3::new(2.0, 2.0, 1.0)),
                Part::block("Torso", Frame::at(6.5, 0.0, 0.0), Vec3::new(2.0, 2.0, 1.0)),
            ],
        );
        // Only the root is tested and it sits clear of the +X face
        let result = contains(Query::Character(&character), &zone, DetectionLevel::Exact, AccuracyLevel::High).unwrap();
        assert!(!result.inside);
    }

    #[test]
    fn test_bounds_sees_edge_overlap_between_samples() {
        // Raised box: the beam only reaches 0.2 into its floor, far from any lattice probe
        let zone = ZoneGeometry::capture(vec![Volume::cuboid(Frame::at(0.0, 5.3, 0.0), Vec3::new(10.0, 10.0, 10.0))]).unwrap();
        let beam = Part::block("beam", Frame::identity(), Vec3::new(40.0, 1.0, 1.0));
        for accuracy in AccuracyLevel::ALL {
            let bounds = contains(Query::Part(&beam), &zone, DetectionLevel::Bounds, accuracy).unwrap();
            assert_eq!(bounds.volumes, vec![0], "{accuracy:?}");
        }
        assert!(contains(Query::Part(&beam), &zone, DetectionLevel::Exact, AccuracyLevel::Low).unwrap().inside);
    }

    #[test]
    fn test_bounds_never_stricter_than_exact() {
        use crate::foundation::math::Quat;
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let hull = Shape::hull(vec![
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(-3.0, -2.0, -3.0),
            Vec3::new(3.0, -2.0, -3.0),
            Vec3::new(0.0, -2.0, 3.0),
        ])
        .unwrap();
        let zone = ZoneGeometry::capture(vec![
            Volume::cuboid(Frame::at(-6.0, 0.0, 0.0), Vec3::new(4.0, 6.0, 4.0)),
            Volume::ball(Vec3::new(6.0, 0.0, 0.0), 2.5),
            Volume::new(Frame::at(0.0, 0.0, 8.0), hull),
        ])
        .unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..400 {
            let position = Vec3::new(rng.gen_range(-12.0..12.0), rng.gen_range(-6.0..6.0), rng.gen_range(-6.0..14.0));
            let rotation = Quat::from_euler_angles(rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0), rng.gen_range(-3.0..3.0));
            let frame = Frame::from_position_rotation(position, rotation);
            let part = if rng.gen_bool(0.5) {
                Part::block("crate", frame, Vec3::new(rng.gen_range(0.2..6.0), rng.gen_range(0.2..6.0), rng.gen_range(0.2..6.0)))
            } else {
                Part::new("ball", frame, Shape::ball(rng.gen_range(0.2..3.0)))
            };
            let exact = contains(Query::Part(&part), &zone, DetectionLevel::Exact, AccuracyLevel::Low).unwrap();
            let bounds = contains(Query::Part(&part), &zone, DetectionLevel::Bounds, AccuracyLevel::Low).unwrap();
            for index in &exact.volumes {
                assert!(bounds.volumes.contains(index), "{part:?} matched {index} exactly but not by bounds");
            }
        }

        // Limbs outside the derived box still count for characters
        let mut reaching = Character::humanoid("reach", Frame::at(0.0, 0.0, -30.0));
        reaching.parts.push(Part::block("LongArm", Frame::at(-6.0, 0.0, -15.0), Vec3::new(1.0, 1.0, 30.0)));
        let exact = contains(Query::Character(&reaching), &zone, DetectionLevel::Exact, AccuracyLevel::Low).unwrap();
        let bounds = contains(Query::Character(&reaching), &zone, DetectionLevel::Bounds, AccuracyLevel::Low).unwrap();
        assert_eq!(exact.volumes, vec![0]);
        assert_eq!(bounds.volumes, vec![0]);
    }
}
