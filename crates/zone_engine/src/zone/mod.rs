//! Zones: captured geometry plus per-occupant membership and events
//!
//! A zone evaluates three occupant categories against its geometry:
//! players (through their characters), items it was asked to follow, and,
//! while anyone listens for part events, every scene part in its region.
//! Evaluation is split in two phases so that group arbitration can run
//! between them: [`Zone::evaluate`] records raw containment,
//! [`Zone::publish`] turns the arbitrated result into events.

mod state;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::{debug, trace};
use rand::Rng;

pub use state::{CallbackId, EntityState};
use state::{take_due, PendingCallback};

use crate::config::ZoneOptions;
use crate::containment::{self, AccuracyLevel, Containment, DetectionLevel, Query};
use crate::error::{ZoneError, ZoneResult};
use crate::events::{EventSystem, Occupant, ZoneEvent, ZoneEventKind};
use crate::foundation::collections::{EntityId, PlayerId, ZoneId};
use crate::foundation::math::{Frame, Vec3};
use crate::geometry::{Volume, ZoneGeometry, AABB};
use crate::scene::{PlayerRoster, Scene};
use crate::scheduler::UpdateScheduler;
use crate::spatial::{EntityKinds, QueryFilter, SpatialQuery};

/// Read-only world view handed to a zone for one evaluation
pub struct EvalContext<'a> {
    /// Scene mirror
    pub scene: &'a Scene,
    /// Connected players
    pub roster: &'a PlayerRoster,
    /// Broad phase
    pub adapter: &'a dyn SpatialQuery,
    /// Combined volume of the item tracker
    pub item_volume: f32,
    /// Combined volume of the player tracker
    pub player_volume: f32,
    /// Zone-to-tracked volume ratio above which `Automatic` means centroid
    pub automatic_volume_ratio: f32,
}

/// A zone and everything it owns
pub struct Zone {
    id: ZoneId,
    name: String,
    registration: usize,
    geometry: ZoneGeometry,
    pending_geometry: Option<ZoneGeometry>,
    options: ZoneOptions,
    scheduler: UpdateScheduler,
    states: BTreeMap<Occupant, EntityState>,
    interest: BTreeSet<EntityId>,
    callbacks: Vec<PendingCallback>,
    ready: Vec<PendingCallback>,
    next_callback: u64,
    events: EventSystem<ZoneEvent>,
}

impl Zone {
    /// Create a zone around captured geometry
    pub fn new(
        id: ZoneId,
        name: impl Into<String>,
        registration: usize,
        geometry: ZoneGeometry,
        options: ZoneOptions,
        update_window: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            registration,
            geometry,
            pending_geometry: None,
            scheduler: UpdateScheduler::new(update_window, options.auto_update, options.respect_update_queue),
            options,
            states: BTreeMap::new(),
            interest: BTreeSet::new(),
            callbacks: Vec::new(),
            ready: Vec::new(),
            next_callback: 0,
            events: EventSystem::new(),
        }
    }

    /// Zone handle
    pub fn id(&self) -> ZoneId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in creation order; breaks arbitration ties
    pub fn registration(&self) -> usize {
        self.registration
    }

    /// Geometry used by the current evaluations
    pub fn geometry(&self) -> &ZoneGeometry {
        &self.geometry
    }

    /// Volumes making up the zone
    pub fn zone_parts(&self) -> &[Volume] {
        self.geometry.volumes()
    }

    /// Bounding region of every volume
    pub fn region(&self) -> AABB {
        self.geometry.region()
    }

    /// Additive volume of the zone
    pub fn volume(&self) -> f32 {
        self.geometry.volume()
    }

    /// Current settings
    pub fn options(&self) -> &ZoneOptions {
        &self.options
    }

    /// Change probe density from the next evaluation on
    pub fn set_accuracy(&mut self, accuracy: AccuracyLevel) {
        self.options.accuracy = accuracy;
    }

    /// Use one detection level for both entering and exiting
    pub fn set_detection(&mut self, detection: DetectionLevel) {
        self.options.enter_detection = detection;
        self.options.exit_detection = detection;
    }

    /// Detection level while an occupant is outside
    pub fn set_enter_detection(&mut self, detection: DetectionLevel) {
        self.options.enter_detection = detection;
    }

    /// Detection level while an occupant is inside
    pub fn set_exit_detection(&mut self, detection: DetectionLevel) {
        self.options.exit_detection = detection;
    }

    /// Toggle on-demand updates
    pub fn set_auto_update(&mut self, enabled: bool) {
        self.options.auto_update = enabled;
        self.scheduler.set_auto_update(enabled);
    }

    /// Toggle debouncing of on-demand updates
    pub fn set_respect_update_queue(&mut self, enabled: bool) {
        self.options.respect_update_queue = enabled;
        self.scheduler.set_respect_update_queue(enabled);
    }

    /// The zone's on-demand scheduler
    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// Raise an on-demand trigger
    pub fn request_update(&mut self, now: f64) -> bool {
        self.scheduler.request(now)
    }

    /// Whether the debounced update is due; consumes it when it is
    pub(crate) fn poll_update(&mut self, now: f64) -> bool {
        self.scheduler.poll(now)
    }

    /// Replace the zone's volumes
    ///
    /// The new list is validated now and swapped in when the next update
    /// runs; until then evaluations keep using the old geometry.
    pub fn set_volumes(&mut self, volumes: Vec<Volume>, now: f64) -> ZoneResult<()> {
        let geometry = ZoneGeometry::capture(volumes)?;
        self.pending_geometry = Some(geometry);
        self.scheduler.request(now);
        Ok(())
    }

    /// Move one volume
    pub fn set_volume_frame(&mut self, index: usize, frame: Frame, now: f64) -> ZoneResult<()> {
        let source = self.pending_geometry.as_ref().unwrap_or(&self.geometry);
        let mut volumes = source.volumes().to_vec();
        let volume = volumes
            .get_mut(index)
            .ok_or_else(|| ZoneError::InvalidGeometry(format!("no volume at index {index}")))?;
        volume.frame = frame;
        self.set_volumes(volumes, now)
    }

    /// Whether replacement geometry is waiting
    pub fn has_pending_geometry(&self) -> bool {
        self.pending_geometry.is_some()
    }

    /// Swap in replacement geometry; true when there was any
    pub(crate) fn apply_pending_geometry(&mut self) -> bool {
        match self.pending_geometry.take() {
            Some(geometry) => {
                debug!("zone '{}' recaptured {} volumes", self.name, geometry.len());
                self.geometry = geometry;
                true
            }
            None => false,
        }
    }

    /// Test an arbitrary query with this zone's accuracy
    pub fn containment(&self, query: Query<'_>, detection: DetectionLevel) -> ZoneResult<Containment> {
        containment::contains(query, &self.geometry, detection, self.options.accuracy)
    }

    /// Whether a world point lies inside the zone
    pub fn find_point(&self, point: Vec3) -> ZoneResult<Containment> {
        containment::contains_point(&self.geometry, point)
    }

    /// Random point inside the zone, using the thread RNG
    pub fn random_point(&self, attempts: u32) -> Option<(Vec3, Vec<usize>)> {
        self.random_point_with(&mut rand::thread_rng(), attempts)
    }

    /// Random point inside the zone by rejection sampling over its region
    ///
    /// Returns the point and the volumes containing it, or `None` when
    /// every attempt landed outside the volumes.
    pub fn random_point_with<R: Rng>(&self, rng: &mut R, attempts: u32) -> Option<(Vec3, Vec<usize>)> {
        let region = self.geometry.region();
        for _ in 0..attempts {
            let point = Vec3::new(
                rng.gen_range(region.min.x..=region.max.x),
                rng.gen_range(region.min.y..=region.max.y),
                rng.gen_range(region.min.z..=region.max.z),
            );
            if let Ok(found) = containment::contains_point(&self.geometry, point) {
                if found.inside {
                    return Some((point, found.volumes));
                }
            }
        }
        debug!("zone '{}': no random point after {} attempts", self.name, attempts);
        None
    }

    /// State for one occupant
    pub fn state(&self, occupant: Occupant) -> Option<&EntityState> {
        self.states.get(&occupant)
    }

    /// Every occupant with state, in stable order
    pub fn states(&self) -> impl Iterator<Item = (Occupant, &EntityState)> + '_ {
        self.states.iter().map(|(o, s)| (*o, s))
    }

    /// Occupants currently published inside, in stable order
    pub fn occupants(&self) -> impl Iterator<Item = Occupant> + '_ {
        self.states.iter().filter(|(_, s)| s.inside).map(|(o, _)| *o)
    }

    /// Players currently inside
    pub fn players(&self) -> Vec<PlayerId> {
        self.occupants()
            .filter_map(|o| match o {
                Occupant::Player(player) => Some(player),
                _ => None,
            })
            .collect()
    }

    /// Scene parts currently inside
    pub fn parts(&self) -> Vec<EntityId> {
        self.occupants()
            .filter_map(|o| match o {
                Occupant::Part(part) => Some(part),
                _ => None,
            })
            .collect()
    }

    /// Followed items currently inside
    pub fn items(&self) -> Vec<EntityId> {
        self.occupants()
            .filter_map(|o| match o {
                Occupant::Item(item) => Some(item),
                _ => None,
            })
            .collect()
    }

    /// Follow an item; false when already followed
    pub(crate) fn add_interest(&mut self, entity: EntityId) -> bool {
        self.interest.insert(entity)
    }

    /// Stop following an item; false when it was not followed
    pub(crate) fn remove_interest(&mut self, entity: EntityId) -> bool {
        self.interest.remove(&entity)
    }

    /// Whether the item was explicitly followed
    pub fn is_tracking(&self, entity: EntityId) -> bool {
        self.interest.contains(&entity)
    }

    /// Items evaluated each tick: followed ones plus those with callbacks
    pub fn watched_items(&self) -> BTreeSet<EntityId> {
        let mut watched = self.interest.clone();
        watched.extend(self.callbacks.iter().map(|c| c.entity));
        watched
    }

    /// Subscribe to one event kind
    pub fn events_mut(&mut self) -> &mut EventSystem<ZoneEvent> {
        &mut self.events
    }

    /// Part events are only evaluated while someone listens for them
    pub fn part_events_enabled(&self) -> bool {
        self.events.subscriber_count(ZoneEventKind::PartEntered) + self.events.subscriber_count(ZoneEventKind::PartExited)
            > 0
    }

    /// Queue a one-shot callback for `entity` crossing into (or out of) the zone
    pub(crate) fn add_callback(&mut self, entity: EntityId, on_enter: bool, callback: Box<dyn FnOnce()>) -> CallbackId {
        let id = CallbackId(self.next_callback);
        self.next_callback += 1;
        self.callbacks.push(PendingCallback {
            id,
            entity,
            on_enter,
            callback,
        });
        id
    }

    /// Drop a queued callback without running it
    pub fn cancel_callback(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|c| c.id != id);
        self.callbacks.len() != before
    }

    /// Number of queued callbacks
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    /// Raw phase: record geometric containment for every candidate occupant
    ///
    /// Failures are isolated per occupant and returned; the occupant keeps
    /// its previous state.
    pub(crate) fn evaluate(&mut self, ctx: &EvalContext<'_>, tick: u64) -> Vec<(Occupant, ZoneError)> {
        let mut errors = Vec::new();

        let players: Vec<(Occupant, EntityId)> = ctx
            .roster
            .iter()
            .filter_map(|(player, character)| character.map(|c| (Occupant::Player(player), c)))
            .collect();
        let bound: HashSet<Occupant> = players.iter().map(|(o, _)| *o).collect();
        self.drop_outside(|o| matches!(o, Occupant::Player(_)) && !bound.contains(o), tick);
        // Any kind: `set_body` may rebuild a driven character as a part
        self.evaluate_set(ctx, tick, &players, EntityKinds::all(), Some(ctx.player_volume), &mut errors);

        // Items nobody watches any more are kept until they are seen outside
        let mut watched = self.watched_items();
        self.states.retain(|o, s| match o {
            Occupant::Item(id) => watched.contains(id) || s.inside || s.raw_inside,
            _ => true,
        });
        watched.extend(self.states.keys().filter_map(|o| match o {
            Occupant::Item(id) => Some(*id),
            _ => None,
        }));
        let items: Vec<(Occupant, EntityId)> = watched
            .into_iter()
            .filter(|id| ctx.scene.contains(*id))
            .map(|id| (Occupant::Item(id), id))
            .collect();
        self.evaluate_set(ctx, tick, &items, EntityKinds::all(), Some(ctx.item_volume), &mut errors);

        if self.part_events_enabled() {
            let mut parts: BTreeSet<EntityId> = ctx
                .adapter
                .query_region(&self.geometry.region(), &QueryFilter::kinds(EntityKinds::PART))
                .into_iter()
                .collect();
            parts.extend(self.states.keys().filter_map(|o| match o {
                Occupant::Part(id) => Some(*id),
                _ => None,
            }));
            let parts: Vec<(Occupant, EntityId)> = parts.into_iter().map(|id| (Occupant::Part(id), id)).collect();
            self.evaluate_set(ctx, tick, &parts, EntityKinds::PART, None, &mut errors);
        } else {
            self.states.retain(|o, _| !matches!(o, Occupant::Part(_)));
        }

        errors
    }

    /// Mark occupants that no longer qualify for evaluation as outside
    fn drop_outside(&mut self, stale: impl Fn(&Occupant) -> bool, tick: u64) {
        for (occupant, state) in self.states.iter_mut() {
            if stale(occupant) {
                state.record(Containment::outside(), tick);
            }
        }
    }

    fn evaluate_set(
        &mut self,
        ctx: &EvalContext<'_>,
        tick: u64,
        occupants: &[(Occupant, EntityId)],
        kinds: EntityKinds,
        tracked_volume: Option<f32>,
        errors: &mut Vec<(Occupant, ZoneError)>,
    ) {
        if occupants.is_empty() {
            return;
        }
        let region = self.geometry.region();
        let mut filter = QueryFilter::whitelist(occupants.iter().map(|(_, id)| *id));
        filter.kinds = kinds;
        let candidates: HashSet<EntityId> = ctx.adapter.query_region(&region, &filter).into_iter().collect();

        for (occupant, entity) in occupants {
            let body = ctx.scene.body(*entity).filter(|_| candidates.contains(entity));
            let Some(body) = body else {
                // Outside the region or gone from the scene
                if let Some(state) = self.states.get_mut(occupant) {
                    state.record(Containment::outside(), tick);
                }
                continue;
            };

            let state = self.states.entry(*occupant).or_default();
            let registration = match occupant {
                Occupant::Player(player) => ctx.roster.registration(*player),
                Occupant::Item(id) | Occupant::Part(id) => ctx.scene.registration(*id),
            };
            state.registration = registration.unwrap_or(state.registration);
            let requested = if state.raw_inside {
                self.options.exit_detection
            } else {
                self.options.enter_detection
            };
            let tracked = tracked_volume.unwrap_or_else(|| body.bounding_volume());
            let detection = requested.resolve(self.geometry.volume(), tracked, ctx.automatic_volume_ratio);

            match containment::contains(Query::from(body), &self.geometry, detection, self.options.accuracy) {
                Ok(result) => {
                    trace!("zone '{}' {:?}: {:?} via {:?}", self.name, occupant, result, detection);
                    state.record(result, tick);
                }
                Err(err) => errors.push((*occupant, err)),
            }
        }
    }

    /// Publish phase: turn arbitrated membership into queued events
    ///
    /// `suppressed` holds occupants that lost group arbitration and are
    /// treated as outside for events. Returns the events queued.
    pub(crate) fn publish(&mut self, now: f64, suppressed: &HashSet<Occupant>, local: Option<PlayerId>) -> Vec<ZoneEvent> {
        // Category first, then registration: handles can be reused
        let mut order: Vec<(u8, u64, Occupant)> = self
            .states
            .iter()
            .map(|(occupant, state)| (category_rank(*occupant), state.registration, *occupant))
            .collect();
        order.sort_unstable();

        let mut published = Vec::new();
        for (_, _, occupant) in order {
            let Some(state) = self.states.get_mut(&occupant) else {
                continue;
            };
            let target = state.raw_inside && !suppressed.contains(&occupant);
            if !state.publish(target) {
                continue;
            }
            let volumes = if target { state.volumes.clone() } else { Vec::new() };
            published.extend(edge_events(self.id, occupant, target, volumes, now, local));
            if let Occupant::Item(entity) = occupant {
                self.ready.extend(take_due(&mut self.callbacks, entity, target));
            }
        }
        for event in &published {
            self.events.send(event.clone());
        }
        published
    }

    /// Deliver queued events, then run callbacks whose transition happened
    pub(crate) fn dispatch(&mut self) -> usize {
        let delivered = self.events.dispatch();
        for pending in std::mem::take(&mut self.ready) {
            (pending.callback)();
        }
        delivered
    }

    /// Forget an occupant, publishing its exit first if it was inside
    ///
    /// Callbacks waiting on the occupant are cancelled, never run.
    pub(crate) fn remove_occupant(&mut self, occupant: Occupant, now: f64, local: Option<PlayerId>) -> Vec<ZoneEvent> {
        if let Occupant::Item(entity) | Occupant::Part(entity) = occupant {
            self.callbacks.retain(|c| c.entity != entity);
            self.ready.retain(|c| c.entity != entity);
        }
        let Some(state) = self.states.remove(&occupant) else {
            return Vec::new();
        };
        if !state.inside {
            return Vec::new();
        }
        let events = edge_events(self.id, occupant, false, Vec::new(), now, local);
        for event in &events {
            self.events.publish(event);
        }
        events
    }

    /// Release every state, callback and subscriber; returns the items the
    /// zone was following
    pub(crate) fn destroy(&mut self) -> Vec<EntityId> {
        debug!("zone '{}' destroyed with {} states", self.name, self.states.len());
        self.states.clear();
        self.callbacks.clear();
        self.ready.clear();
        self.events.clear();
        self.pending_geometry = None;
        self.scheduler.set_auto_update(false);
        std::mem::take(&mut self.interest).into_iter().collect()
    }
}

impl std::fmt::Debug for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("volumes", &self.geometry.len())
            .field("states", &self.states.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

fn category_rank(occupant: Occupant) -> u8 {
    match occupant {
        Occupant::Item(_) => 0,
        Occupant::Part(_) => 1,
        Occupant::Player(_) => 2,
    }
}

fn edge_events(
    zone: ZoneId,
    occupant: Occupant,
    entered: bool,
    volumes: Vec<usize>,
    now: f64,
    local: Option<PlayerId>,
) -> Vec<ZoneEvent> {
    let mut events = vec![ZoneEvent {
        kind: ZoneEventKind::for_occupant(occupant, entered),
        zone,
        occupant,
        volumes: volumes.clone(),
        timestamp: now,
    }];
    if matches!(occupant, Occupant::Player(player) if Some(player) == local) {
        events.push(ZoneEvent {
            kind: if entered {
                ZoneEventKind::LocalPlayerEntered
            } else {
                ZoneEventKind::LocalPlayerExited
            },
            zone,
            occupant,
            volumes,
            timestamp: now,
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn zone_with(volumes: Vec<Volume>) -> Zone {
        let mut ids: SlotMap<ZoneId, ()> = SlotMap::with_key();
        let geometry = ZoneGeometry::capture(volumes).unwrap();
        Zone::new(ids.insert(()), "test", 0, geometry, ZoneOptions::default(), 0.1)
    }

    #[test]
    fn test_find_point_on_ten_cube() {
        let zone = zone_with(vec![Volume::cuboid(Frame::identity(), Vec3::new(10.0, 10.0, 10.0))]);
        assert_eq!(zone.find_point(Vec3::zeros()).unwrap(), Containment { inside: true, volumes: vec![0] });
        assert_eq!(zone.find_point(Vec3::new(100.0, 0.0, 0.0)).unwrap(), Containment::outside());
    }

    #[test]
    fn test_random_points_land_inside_sparse_zone() {
        // Two small balls far apart leave most of the region empty
        let zone = zone_with(vec![
            Volume::ball(Vec3::new(-20.0, 0.0, 0.0), 2.0),
            Volume::ball(Vec3::new(20.0, 0.0, 0.0), 2.0),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let (point, volumes) = zone.random_point_with(&mut rng, 5000).unwrap();
            let check = zone.find_point(point).unwrap();
            assert!(check.inside);
            assert_eq!(check.volumes, volumes);
        }
    }

    #[test]
    fn test_random_point_gives_up() {
        let zone = zone_with(vec![Volume::ball(Vec3::zeros(), 1.0), Volume::ball(Vec3::new(1000.0, 1000.0, 1000.0), 1.0)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(zone.random_point_with(&mut rng, 3).is_none());
    }

    #[test]
    fn test_geometry_swap_waits_for_update() {
        let mut zone = zone_with(vec![Volume::cuboid(Frame::identity(), Vec3::new(10.0, 10.0, 10.0))]);
        zone.set_volume_frame(0, Frame::at(50.0, 0.0, 0.0), 0.0).unwrap();
        assert!(zone.find_point(Vec3::zeros()).unwrap().inside);
        assert!(zone.has_pending_geometry());
        assert!(!zone.poll_update(0.05));
        assert!(zone.poll_update(0.1));
        assert!(zone.apply_pending_geometry());
        assert!(!zone.find_point(Vec3::zeros()).unwrap().inside);
        assert!(zone.find_point(Vec3::new(50.0, 0.0, 0.0)).unwrap().inside);
    }

    #[test]
    fn test_set_volumes_rejects_empty_list() {
        let mut zone = zone_with(vec![Volume::ball(Vec3::zeros(), 1.0)]);
        assert!(matches!(zone.set_volumes(Vec::new(), 0.0), Err(ZoneError::InvalidGeometry(_))));
        assert!(matches!(zone.set_volume_frame(3, Frame::identity(), 0.0), Err(ZoneError::InvalidGeometry(_))));
        assert!(!zone.has_pending_geometry());
    }

    #[test]
    fn test_settings_keep_state() {
        let mut zone = zone_with(vec![Volume::ball(Vec3::zeros(), 1.0)]);
        zone.set_detection(DetectionLevel::Bounds);
        zone.set_exit_detection(DetectionLevel::Centroid);
        zone.set_accuracy(AccuracyLevel::Low);
        let options = zone.options();
        assert_eq!(options.enter_detection, DetectionLevel::Bounds);
        assert_eq!(options.exit_detection, DetectionLevel::Centroid);
        assert_eq!(options.accuracy, AccuracyLevel::Low);
    }
}
