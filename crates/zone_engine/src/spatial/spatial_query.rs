//! Host query adapter for broad-phase candidate retrieval
//!
//! The zone engine never walks a broad-phase structure itself. It keeps an
//! implementation of [`SpatialQuery`] in sync with scene notifications and
//! asks it for candidates inside a region. Hosts with their own physics
//! broad phase implement the trait over it; [`OctreeSpatialQuery`] is the
//! in-process default.

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;

use super::octree::{Octree, OctreeEntry};
use crate::foundation::collections::EntityId;
use crate::geometry::AABB;

bitflags! {
    /// Entity categories a region query may return
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityKinds: u32 {
        /// Standalone rigid bodies
        const PART = 1 << 0;
        /// Articulated characters
        const CHARACTER = 1 << 1;
    }
}

/// Filter parameters for a region query (the host's overlap parameters)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    /// Accepted entity categories
    pub kinds: EntityKinds,
    /// When set, only these entities are returned
    pub whitelist: Option<HashSet<EntityId>>,
    /// Entities never returned
    pub exclude: HashSet<EntityId>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            kinds: EntityKinds::all(),
            whitelist: None,
            exclude: HashSet::new(),
        }
    }
}

impl QueryFilter {
    /// Accept only the given kinds
    pub fn kinds(kinds: EntityKinds) -> Self {
        Self {
            kinds,
            ..Self::default()
        }
    }

    /// Restrict results to a set of entities
    pub fn whitelist<I: IntoIterator<Item = EntityId>>(ids: I) -> Self {
        Self {
            whitelist: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Whether an entity of `kind` passes this filter
    pub fn accepts(&self, id: EntityId, kind: EntityKinds) -> bool {
        self.kinds.intersects(kind)
            && !self.exclude.contains(&id)
            && self.whitelist.as_ref().map_or(true, |w| w.contains(&id))
    }
}

/// Abstract interface for the broad phase used to pre-filter zone candidates
pub trait SpatialQuery {
    /// Insert an entity with its world bounds
    fn insert(&mut self, id: EntityId, bounds: AABB, kind: EntityKinds);

    /// Forget an entity; unknown ids are ignored
    fn remove(&mut self, id: EntityId);

    /// Refresh the bounds of an entity already inserted
    fn update(&mut self, id: EntityId, bounds: AABB);

    /// Entities whose bounds intersect `region` and pass `filter`
    ///
    /// Results are ordered by entity handle so evaluation order is stable.
    fn query_region(&self, region: &AABB, filter: &QueryFilter) -> Vec<EntityId>;

    /// Stored bounds and kind
    fn entity_data(&self, id: EntityId) -> Option<(AABB, EntityKinds)>;

    /// Forget every entity
    fn clear(&mut self);

    /// Number of stored entities
    fn entity_count(&self) -> usize;
}

/// [`SpatialQuery`] over an in-process [`Octree`]
pub struct OctreeSpatialQuery {
    octree: Octree,
    // Kind lookup for `update`, which only receives new bounds
    entity_cache: HashMap<EntityId, (AABB, EntityKinds)>,
}

impl OctreeSpatialQuery {
    /// Adapter over an empty or pre-filled tree
    pub fn new(octree: Octree) -> Self {
        Self {
            octree,
            entity_cache: HashMap::new(),
        }
    }

    /// Backing tree
    pub fn octree(&self) -> &Octree {
        &self.octree
    }
}

impl SpatialQuery for OctreeSpatialQuery {
    fn insert(&mut self, id: EntityId, bounds: AABB, kind: EntityKinds) {
        if self.entity_cache.contains_key(&id) {
            self.octree.remove(id);
        }
        self.octree.insert(OctreeEntry { id, bounds, kind });
        self.entity_cache.insert(id, (bounds, kind));
    }

    fn remove(&mut self, id: EntityId) {
        self.octree.remove(id);
        self.entity_cache.remove(&id);
    }

    fn update(&mut self, id: EntityId, bounds: AABB) {
        let Some(&(_, kind)) = self.entity_cache.get(&id) else {
            return;
        };
        self.octree.remove(id);
        self.octree.insert(OctreeEntry { id, bounds, kind });
        self.entity_cache.insert(id, (bounds, kind));
    }

    fn query_region(&self, region: &AABB, filter: &QueryFilter) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .octree
            .query_aabb(region)
            .into_iter()
            .filter(|entry| filter.accepts(entry.id, entry.kind))
            .map(|entry| entry.id)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    fn entity_data(&self, id: EntityId) -> Option<(AABB, EntityKinds)> {
        self.entity_cache.get(&id).copied()
    }

    fn clear(&mut self) {
        self.octree.clear();
        self.entity_cache.clear();
    }

    fn entity_count(&self) -> usize {
        self.entity_cache.len()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::spatial::OctreeConfig;
    use slotmap::SlotMap;

    fn create_test_query() -> OctreeSpatialQuery {
        OctreeSpatialQuery::new(Octree::from_config(OctreeConfig {
            leaf_capacity: 2,
            world_half_size: 100.0,
            ..OctreeConfig::default()
        }))
    }

    fn cube(center: Vec3, half: f32) -> AABB {
        AABB::from_center_extents(center, Vec3::new(half, half, half))
    }

    #[test]
    fn test_spatial_query_insert_remove() {
        let mut ids: SlotMap<EntityId, ()> = SlotMap::with_key();
        let mut spatial = create_test_query();

        let entity = ids.insert(());
        spatial.insert(entity, cube(Vec3::zeros(), 5.0), EntityKinds::PART);
        // Re-inserting replaces the old entry
        spatial.insert(entity, cube(Vec3::new(3.0, 0.0, 0.0), 5.0), EntityKinds::PART);
        assert_eq!(spatial.entity_count(), 1);
        assert_eq!(spatial.octree().entity_count(), 1);

        spatial.remove(entity);
        assert_eq!(spatial.entity_count(), 0);
    }

    #[test]
    fn test_filter_by_kind_and_whitelist() {
        let mut ids: SlotMap<EntityId, ()> = SlotMap::with_key();
        let mut spatial = create_test_query();

        let part = ids.insert(());
        let character = ids.insert(());
        let other = ids.insert(());
        spatial.insert(part, cube(Vec3::zeros(), 1.0), EntityKinds::PART);
        spatial.insert(character, cube(Vec3::new(1.0, 0.0, 0.0), 1.0), EntityKinds::CHARACTER);
        spatial.insert(other, cube(Vec3::new(-1.0, 0.0, 0.0), 1.0), EntityKinds::PART);

        let region = cube(Vec3::zeros(), 3.0);
        assert_eq!(spatial.query_region(&region, &QueryFilter::kinds(EntityKinds::CHARACTER)), vec![character]);
        assert_eq!(spatial.query_region(&region, &QueryFilter::whitelist([part])), vec![part]);
        assert_eq!(spatial.query_region(&region, &QueryFilter::default()).len(), 3);
    }

    #[test]
    fn test_update_moves_entity_out_of_region() {
        let mut ids: SlotMap<EntityId, ()> = SlotMap::with_key();
        let mut spatial = create_test_query();

        let entity = ids.insert(());
        spatial.insert(entity, cube(Vec3::zeros(), 1.0), EntityKinds::PART);
        spatial.update(entity, cube(Vec3::new(50.0, 0.0, 0.0), 1.0));

        let region = cube(Vec3::zeros(), 3.0);
        assert!(spatial.query_region(&region, &QueryFilter::default()).is_empty());
        assert_eq!(spatial.entity_data(entity).map(|(b, _)| b.center()), Some(Vec3::new(50.0, 0.0, 0.0)));
    }
}
