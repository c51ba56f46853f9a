//! Live sets of tracked entities
//!
//! Two trackers run side by side: one for player characters, one for items
//! (parts and characters that zones asked to follow). Zones read them; only
//! the controller mutates them.

use log::debug;

use crate::events::{EventSystem, TrackerEvent, TrackerEventKind};
use crate::foundation::collections::{EntityId, SecondaryMap};
use crate::foundation::math::{Frame, Vec3};
use crate::scene::{Character, Scene};
use crate::spatial::EntityKinds;

#[derive(Debug, Clone, Copy)]
struct TrackedEntry {
    seq: u64,
    kind: EntityKinds,
    interest: usize,
}

/// Tracked entity set with lifecycle notifications
#[derive(Debug)]
pub struct Tracker {
    name: &'static str,
    entries: SecondaryMap<EntityId, TrackedEntry>,
    next_seq: u64,
    events: EventSystem<TrackerEvent>,
}

impl Tracker {
    /// Create an empty tracker; `name` only appears in logs
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: SecondaryMap::new(),
            next_seq: 0,
            events: EventSystem::new(),
        }
    }

    /// Tracker name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Start tracking; false (and no notification) when already tracked
    pub fn track(&mut self, entity: EntityId, kind: EntityKinds) -> bool {
        if self.entries.contains_key(entity) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(entity, TrackedEntry { seq, kind, interest: 0 });
        debug!("{} tracker: added {:?} as {:?}", self.name, entity, kind);
        self.events.publish(&TrackerEvent {
            kind: TrackerEventKind::ItemAdded,
            entity,
        });
        true
    }

    /// Stop tracking; false when the entity was not tracked
    pub fn untrack(&mut self, entity: EntityId) -> bool {
        if self.entries.remove(entity).is_none() {
            return false;
        }
        debug!("{} tracker: removed {:?}", self.name, entity);
        self.events.publish(&TrackerEvent {
            kind: TrackerEventKind::ItemRemoved,
            entity,
        });
        true
    }

    /// Add one unit of zone interest, tracking on first interest
    pub fn retain(&mut self, entity: EntityId, kind: EntityKinds) {
        self.track(entity, kind);
        if let Some(entry) = self.entries.get_mut(entity) {
            entry.interest += 1;
        }
    }

    /// Drop one unit of zone interest, untracking at zero
    pub fn release(&mut self, entity: EntityId) {
        let remaining = match self.entries.get_mut(entity) {
            Some(entry) => {
                entry.interest = entry.interest.saturating_sub(1);
                entry.interest
            }
            None => return,
        };
        if remaining == 0 {
            self.untrack(entity);
        }
    }

    /// Record a new classification; true when it changed
    pub fn reclassify(&mut self, entity: EntityId, kind: EntityKinds) -> bool {
        match self.entries.get_mut(entity) {
            Some(entry) if entry.kind != kind => {
                debug!("{} tracker: {:?} is now {:?}", self.name, entity, kind);
                entry.kind = kind;
                true
            }
            _ => false,
        }
    }

    /// Whether the entity is tracked
    pub fn is_tracked(&self, entity: EntityId) -> bool {
        self.entries.contains_key(entity)
    }

    /// Classification captured at tracking time
    pub fn kind_of(&self, entity: EntityId) -> Option<EntityKinds> {
        self.entries.get(entity).map(|e| e.kind)
    }

    /// Tracked entities in registration order
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ordered: Vec<_> = self.entries.iter().map(|(id, e)| (e.seq, id)).collect();
        ordered.sort_unstable_by_key(|(seq, _)| *seq);
        ordered.into_iter().map(|(_, id)| id).collect()
    }

    /// Number of tracked entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every tracked entity's approximate bounding volume
    pub fn combined_total_volume(&self, scene: &Scene) -> f32 {
        self.entries
            .keys()
            .filter_map(|id| scene.body(id))
            .map(|body| body.bounding_volume())
            .sum()
    }

    /// Character box size and frame; `None` without a root and head
    pub fn character_size(character: &Character) -> Option<(Vec3, Frame)> {
        character.size_and_frame()
    }

    /// Lifecycle notifications (`ItemAdded`, `ItemRemoved`)
    pub fn events_mut(&mut self) -> &mut EventSystem<TrackerEvent> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Body, Part};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(tracker: &mut Tracker) -> Rc<RefCell<Vec<TrackerEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [TrackerEventKind::ItemAdded, TrackerEventKind::ItemRemoved] {
            let log = log.clone();
            tracker
                .events_mut()
                .register_handler(kind, move |e: &TrackerEvent| log.borrow_mut().push(*e));
        }
        log
    }

    #[test]
    fn test_track_is_idempotent() {
        let mut scene = Scene::new();
        let id = scene.insert(Body::Part(Part::block("a", Frame::identity(), Vec3::new(1.0, 1.0, 1.0))));
        let mut tracker = Tracker::new("item");
        let log = recording(&mut tracker);

        assert!(tracker.track(id, EntityKinds::PART));
        assert!(!tracker.track(id, EntityKinds::PART));
        assert_eq!(log.borrow().len(), 1);

        assert!(tracker.untrack(id));
        assert!(!tracker.untrack(id));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(log.borrow()[1].kind, TrackerEventKind::ItemRemoved);
    }

    #[test]
    fn test_interest_counting() {
        let mut scene = Scene::new();
        let id = scene.insert(Body::Part(Part::block("a", Frame::identity(), Vec3::new(1.0, 1.0, 1.0))));
        let mut tracker = Tracker::new("item");
        tracker.retain(id, EntityKinds::PART);
        tracker.retain(id, EntityKinds::PART);
        tracker.release(id);
        assert!(tracker.is_tracked(id));
        tracker.release(id);
        assert!(!tracker.is_tracked(id));
    }

    #[test]
    fn test_combined_volume_and_order() {
        let mut scene = Scene::new();
        let a = scene.insert(Body::Part(Part::block("a", Frame::identity(), Vec3::new(1.0, 2.0, 3.0))));
        let b = scene.insert(Body::Part(Part::block("b", Frame::identity(), Vec3::new(2.0, 2.0, 2.0))));
        let mut tracker = Tracker::new("item");
        tracker.track(b, EntityKinds::PART);
        tracker.track(a, EntityKinds::PART);
        assert_relative_eq!(tracker.combined_total_volume(&scene), 14.0);
        assert_eq!(tracker.entities(), vec![b, a]);
    }

    #[test]
    fn test_character_size_requires_root() {
        let hero = Character::humanoid("hero", Frame::identity());
        let (size, _) = Tracker::character_size(&hero).unwrap();
        assert_relative_eq!(size, Vec3::new(4.0, 5.0, 1.0));
        let limbless = Character::new("ghost", Vec::new());
        assert!(Tracker::character_size(&limbless).is_none());
    }
}
