//! Loose octree over entity bounds
//!
//! Entries are filed by the centre of their bounds. A cell splits into
//! eight children once it holds more than [`OctreeConfig::leaf_capacity`]
//! entries. Because an entry can reach past the cell that files it, region
//! queries widen every cell by the largest half extent seen so far.
//!
//! Entries centred outside the root cube are kept in a flat overflow list
//! and scanned on every query.

use serde::{Deserialize, Serialize};

use super::spatial_query::EntityKinds;
use crate::foundation::collections::EntityId;
use crate::foundation::math::Vec3;
use crate::geometry::AABB;

/// Octree tuning, loaded as part of the engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Entries a leaf holds before it splits
    pub leaf_capacity: usize,
    /// Deepest level a cell may split to
    pub max_depth: u32,
    /// Cells with a half extent at or below this never split
    pub min_cell_size: f32,
    /// Half size of the root cube, centred on the world origin
    pub world_half_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            leaf_capacity: 16,
            max_depth: 6,
            min_cell_size: 4.0,
            world_half_size: 4096.0,
        }
    }
}

/// Entity as filed in the tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeEntry {
    /// Scene entity
    pub id: EntityId,
    /// World bounds at the last insert or update
    pub bounds: AABB,
    /// Part or character
    pub kind: EntityKinds,
}

/// Child slot for a point: bit 0 is +X, bit 1 is +Y, bit 2 is +Z
fn slot_of(center: Vec3, point: Vec3) -> usize {
    usize::from(point.x >= center.x) | (usize::from(point.y >= center.y) << 1) | (usize::from(point.z >= center.z) << 2)
}

#[derive(Debug, Clone)]
struct Cell {
    bounds: AABB,
    depth: u32,
    entries: Vec<OctreeEntry>,
    children: Option<Box<[Cell; 8]>>,
}

impl Cell {
    fn new(bounds: AABB, depth: u32) -> Self {
        Self { bounds, depth, entries: Vec::new(), children: None }
    }

    fn can_split(&self, config: &OctreeConfig) -> bool {
        self.depth < config.max_depth && self.bounds.extents().min() > config.min_cell_size
    }

    fn split(&mut self) {
        let parent = self.bounds;
        let step = parent.extents();
        let depth = self.depth + 1;
        let cells: [Cell; 8] = std::array::from_fn(|slot| {
            let min = Vec3::new(
                if slot & 1 == 0 { parent.min.x } else { parent.min.x + step.x },
                if slot & 2 == 0 { parent.min.y } else { parent.min.y + step.y },
                if slot & 4 == 0 { parent.min.z } else { parent.min.z + step.z },
            );
            Cell::new(AABB::new(min, min + step), depth)
        });

        let mut children = Box::new(cells);
        for entry in self.entries.drain(..) {
            children[slot_of(parent.center(), entry.bounds.center())].entries.push(entry);
        }
        self.children = Some(children);
    }

    fn insert(&mut self, entry: OctreeEntry, config: &OctreeConfig) {
        if self.children.is_none() {
            if self.entries.len() < config.leaf_capacity || !self.can_split(config) {
                self.entries.push(entry);
                return;
            }
            self.split();
        }
        let slot = slot_of(self.bounds.center(), entry.bounds.center());
        if let Some(children) = self.children.as_mut() {
            children[slot].insert(entry, config);
        }
    }

    fn remove(&mut self, id: EntityId) -> bool {
        if let Some(i) = self.entries.iter().position(|e| e.id == id) {
            self.entries.swap_remove(i);
            return true;
        }
        self.children
            .as_mut()
            .is_some_and(|children| children.iter_mut().any(|c| c.remove(id)))
    }

    fn collect(&self, region: &AABB, margin: f32, out: &mut Vec<OctreeEntry>) {
        if !self.bounds.expanded(margin).intersects(region) {
            return;
        }
        out.extend(self.entries.iter().filter(|e| e.bounds.intersects(region)));
        if let Some(children) = &self.children {
            children.iter().for_each(|c| c.collect(region, margin, out));
        }
    }

    fn len(&self) -> usize {
        self.entries.len() + self.children.as_ref().map_or(0, |c| c.iter().map(Cell::len).sum())
    }

    fn deepest(&self) -> u32 {
        self.children
            .as_ref()
            .map_or(self.depth, |c| c.iter().map(Cell::deepest).max().unwrap_or(self.depth))
    }
}

/// Loose octree with an overflow list for entries outside the root cube
#[derive(Debug, Clone)]
pub struct Octree {
    root: Cell,
    overflow: Vec<OctreeEntry>,
    config: OctreeConfig,
    // Grows on insert, only reset by `clear`
    margin: f32,
}

impl Octree {
    /// Empty tree over explicit root bounds
    pub fn new(world_bounds: AABB, config: OctreeConfig) -> Self {
        Self { root: Cell::new(world_bounds, 0), overflow: Vec::new(), config, margin: 0.0 }
    }

    /// Empty tree whose root cube comes from `config.world_half_size`
    pub fn from_config(config: OctreeConfig) -> Self {
        let h = config.world_half_size;
        Self::new(AABB::from_center_extents(Vec3::zeros(), Vec3::new(h, h, h)), config)
    }

    /// File an entry; callers remove any previous entry for the same id first
    pub fn insert(&mut self, entry: OctreeEntry) {
        self.margin = self.margin.max(entry.bounds.extents().max());
        if self.root.bounds.contains_point(entry.bounds.center()) {
            self.root.insert(entry, &self.config);
        } else {
            self.overflow.push(entry);
        }
    }

    /// Drop an entry, returning whether it was present
    pub fn remove(&mut self, id: EntityId) -> bool {
        if self.root.remove(id) {
            return true;
        }
        match self.overflow.iter().position(|e| e.id == id) {
            Some(i) => {
                self.overflow.swap_remove(i);
                true
            }
            None => false,
        }
    }

    /// Entries whose bounds intersect `region`
    pub fn query_aabb(&self, region: &AABB) -> Vec<OctreeEntry> {
        let mut out = Vec::new();
        self.root.collect(region, self.margin, &mut out);
        out.extend(self.overflow.iter().filter(|e| e.bounds.intersects(region)));
        out
    }

    /// Number of filed entries, overflow included
    pub fn entity_count(&self) -> usize {
        self.root.len() + self.overflow.len()
    }

    /// Deepest level any cell has split to
    pub fn depth(&self) -> u32 {
        self.root.deepest()
    }

    /// Remove everything and collapse back to a single root cell
    pub fn clear(&mut self) {
        self.root = Cell::new(self.root.bounds, 0);
        self.overflow.clear();
        self.margin = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn entry(ids: &mut SlotMap<EntityId, ()>, center: Vec3, half: f32) -> OctreeEntry {
        OctreeEntry {
            id: ids.insert(()),
            bounds: AABB::from_center_extents(center, Vec3::new(half, half, half)),
            kind: EntityKinds::PART,
        }
    }

    fn small_tree(leaf_capacity: usize) -> Octree {
        Octree::from_config(OctreeConfig {
            leaf_capacity,
            max_depth: 3,
            min_cell_size: 1.0,
            world_half_size: 100.0,
        })
    }

    #[test]
    fn crowded_leaf_splits_up_to_max_depth() {
        let mut ids = SlotMap::with_key();
        let mut tree = small_tree(4);
        for _ in 0..10 {
            tree.insert(entry(&mut ids, Vec3::new(1.0, 1.0, 1.0), 0.5));
        }

        assert_eq!(tree.entity_count(), 10);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn split_keeps_entries_queryable() {
        let mut ids = SlotMap::with_key();
        let mut tree = small_tree(2);
        let spots = [(-60.0, -60.0), (60.0, -60.0), (-60.0, 60.0), (60.0, 60.0)];
        for (x, z) in spots {
            tree.insert(entry(&mut ids, Vec3::new(x, 0.0, z), 1.0));
        }
        assert!(tree.depth() >= 1);

        let region = AABB::from_center_extents(Vec3::new(60.0, 0.0, 60.0), Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(tree.query_aabb(&region).len(), 1);
        let everything = AABB::from_center_extents(Vec3::zeros(), Vec3::new(100.0, 100.0, 100.0));
        assert_eq!(tree.query_aabb(&everything).len(), 4);
    }

    #[test]
    fn region_query_finds_straddling_entry() {
        let mut ids = SlotMap::with_key();
        let mut tree = small_tree(1);

        let big = entry(&mut ids, Vec3::new(-1.0, -1.0, -1.0), 10.0);
        tree.insert(big);
        tree.insert(entry(&mut ids, Vec3::new(50.0, 50.0, 50.0), 1.0));
        tree.insert(entry(&mut ids, Vec3::new(-50.0, 50.0, 50.0), 1.0));

        // Only the positive octant is touched; the big entry reaches into it
        let region = AABB::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(8.0, 8.0, 8.0));
        let found = tree.query_aabb(&region);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, big.id);
    }

    #[test]
    fn overflow_entries_are_found_and_removed() {
        let mut ids = SlotMap::with_key();
        let mut tree = small_tree(8);

        let far = entry(&mut ids, Vec3::new(500.0, 0.0, 0.0), 1.0);
        tree.insert(far);
        assert_eq!(tree.entity_count(), 1);
        let region = AABB::from_center_extents(Vec3::new(500.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(tree.query_aabb(&region).len(), 1);

        assert!(tree.remove(far.id));
        assert!(!tree.remove(far.id));
        assert_eq!(tree.entity_count(), 0);
    }

    #[test]
    fn clear_resets_depth() {
        let mut ids = SlotMap::with_key();
        let mut tree = small_tree(1);
        for i in 0..6 {
            tree.insert(entry(&mut ids, Vec3::new(i as f32 * 10.0, 0.0, 0.0), 1.0));
        }
        tree.clear();
        assert_eq!(tree.entity_count(), 0);
        assert_eq!(tree.depth(), 0);
    }
}
