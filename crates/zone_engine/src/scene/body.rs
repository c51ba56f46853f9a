//! Rigid bodies and articulated characters as seen by the zone engine

use crate::foundation::math::{Frame, Vec3};
use crate::geometry::{Shape, AABB};
use crate::spatial::EntityKinds;

/// Name of the part that anchors a character
pub const ROOT_PART: &str = "HumanoidRootPart";

/// Name of the part whose height extends the character box
pub const HEAD_PART: &str = "Head";

/// Body parts skipped by exact character tests; the remaining limbs
/// already cover the silhouette
pub const IGNORED_BODY_PARTS: [&str; 7] = [
    "UpperTorso",
    "LowerTorso",
    "Torso",
    "LeftHand",
    "RightHand",
    "LeftFoot",
    "RightFoot",
];

/// A standalone rigid body, or one limb of a character
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    /// Host-side name
    pub name: String,
    /// World placement
    pub frame: Frame,
    /// Local-space collision shape
    pub shape: Shape,
}

impl Part {
    /// Create a part
    pub fn new(name: impl Into<String>, frame: Frame, shape: Shape) -> Self {
        Self {
            name: name.into(),
            frame,
            shape,
        }
    }

    /// Box-shaped part of the given full size
    pub fn block(name: impl Into<String>, frame: Frame, size: Vec3) -> Self {
        Self::new(name, frame, Shape::cuboid(size))
    }

    /// Full local bounding size
    pub fn size(&self) -> Vec3 {
        self.shape.size()
    }

    /// World-space bounds
    pub fn world_aabb(&self) -> AABB {
        self.shape.world_aabb(&self.frame)
    }

    /// Volume of the part's bounding size, the tracker's cost estimate
    pub fn bounding_volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }
}

/// Articulated body identified by its root part
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    /// Host-side name
    pub name: String,
    /// Limbs, including the root and head when present
    pub parts: Vec<Part>,
}

impl Character {
    /// Create a character from its parts
    pub fn new(name: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            name: name.into(),
            parts,
        }
    }

    /// Conventional humanoid: 2x2x1 root, 1-stud head above it, two
    /// arms and two legs, standing with its root at `frame`
    pub fn humanoid(name: impl Into<String>, frame: Frame) -> Self {
        let limb = Vec3::new(1.0, 2.0, 1.0);
        let parts = vec![
            Part::block(ROOT_PART, frame, Vec3::new(2.0, 2.0, 1.0)),
            Part::block(HEAD_PART, frame.translated_local(Vec3::new(0.0, 1.5, 0.0)), Vec3::new(1.0, 1.0, 1.0)),
            Part::block("Torso", frame, Vec3::new(2.0, 2.0, 1.0)),
            Part::block("LeftArm", frame.translated_local(Vec3::new(-1.5, 0.0, 0.0)), limb),
            Part::block("RightArm", frame.translated_local(Vec3::new(1.5, 0.0, 0.0)), limb),
            Part::block("LeftLeg", frame.translated_local(Vec3::new(-0.5, -2.0, 0.0)), limb),
            Part::block("RightLeg", frame.translated_local(Vec3::new(0.5, -2.0, 0.0)), limb),
        ];
        Self::new(name, parts)
    }

    /// Find a limb by name
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// The root part, if the character has one
    pub fn root(&self) -> Option<&Part> {
        self.part(ROOT_PART)
    }

    /// Approximate character box: size and centre frame
    ///
    /// Root size doubled on X and Y, plus the head height on Y, centred so
    /// the top of the box meets the top of the head. `None` when the root
    /// or head is missing.
    pub fn size_and_frame(&self) -> Option<(Vec3, Frame)> {
        let root = self.root()?;
        let head = self.part(HEAD_PART)?;
        let head_y = head.size().y;
        let root_size = root.size();

        let size = root_size.component_mul(&Vec3::new(2.0, 2.0, 1.0)) + Vec3::new(0.0, head_y, 0.0);
        let frame = root.frame.translated_local(Vec3::new(0.0, head_y / 2.0 - root_size.y / 2.0, 0.0));
        Some((size, frame))
    }

    /// Limbs used by exact tests
    pub fn detection_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts
            .iter()
            .filter(|p| !IGNORED_BODY_PARTS.contains(&p.name.as_str()))
    }

    /// Union of every limb's bounds
    pub fn world_aabb(&self) -> Option<AABB> {
        self.parts
            .iter()
            .map(Part::world_aabb)
            .reduce(|acc, aabb| acc.union(&aabb))
    }

    /// Move the character rigidly so that its root lands on `frame`
    ///
    /// Returns `false` when there is no root to anchor the move.
    pub fn set_root_frame(&mut self, frame: Frame) -> bool {
        let Some(root) = self.root().map(|r| r.frame) else {
            return false;
        };
        for part in &mut self.parts {
            let offset = Frame::from_position_rotation(
                root.inverse_transform_point(part.frame.position),
                root.rotation.inverse() * part.frame.rotation,
            );
            part.frame = frame.combine(&offset);
        }
        true
    }
}

/// Anything the scene can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Standalone rigid body
    Part(Part),
    /// Articulated character
    Character(Character),
}

impl Body {
    /// Broad-phase category
    pub fn kind(&self) -> EntityKinds {
        match self {
            Self::Part(_) => EntityKinds::PART,
            Self::Character(_) => EntityKinds::CHARACTER,
        }
    }

    /// Host-side name
    pub fn name(&self) -> &str {
        match self {
            Self::Part(part) => &part.name,
            Self::Character(character) => &character.name,
        }
    }

    /// World bounds; characters without limbs have none
    pub fn world_aabb(&self) -> Option<AABB> {
        match self {
            Self::Part(part) => Some(part.world_aabb()),
            Self::Character(character) => character.world_aabb(),
        }
    }

    /// Approximate bounding volume used to size broad-phase work
    pub fn bounding_volume(&self) -> f32 {
        match self {
            Self::Part(part) => part.bounding_volume(),
            Self::Character(character) => character
                .size_and_frame()
                .map_or(0.0, |(size, _)| size.x * size.y * size.z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_character_size_from_root_and_head() {
        let character = Character::humanoid("npc", Frame::at(0.0, 3.0, 0.0));
        let (size, frame) = character.size_and_frame().unwrap();
        assert_relative_eq!(size, Vec3::new(4.0, 5.0, 1.0));
        // Box top = root centre + 1 (root half height) + 1 (head) = 5
        assert_relative_eq!(frame.position.y + size.y / 2.0, 5.0, epsilon = 1.0e-5);
    }

    #[test]
    fn test_character_without_head_has_no_size() {
        let mut character = Character::humanoid("npc", Frame::identity());
        character.parts.retain(|p| p.name != HEAD_PART);
        assert!(character.size_and_frame().is_none());
    }

    #[test]
    fn test_detection_parts_skip_torso_and_extremities() {
        let character = Character::humanoid("npc", Frame::identity());
        let names: Vec<&str> = character.detection_parts().map(|p| p.name.as_str()).collect();
        assert!(!names.contains(&"Torso"));
        assert!(names.contains(&ROOT_PART));
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_set_root_frame_keeps_limb_offsets() {
        let mut character = Character::humanoid("npc", Frame::identity());
        let turned = Frame::from_position_rotation(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::PI),
        );
        assert!(character.set_root_frame(turned));
        let arm = character.part("LeftArm").unwrap();
        assert_relative_eq!(arm.frame.position, Vec3::new(11.5, 0.0, 0.0), epsilon = 1.0e-4);
    }
}
