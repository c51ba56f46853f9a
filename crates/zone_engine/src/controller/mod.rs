//! Zone controller: owns the scene mirror, trackers, zones and groups and
//! drives evaluation
//!
//! The host forwards scene notifications (spawn, move, detach, destroy,
//! player changes) and calls [`ZoneController::step`] once per frame. Each
//! step runs in four phases:
//!
//! 1. due debounced updates swap in replacement geometry
//! 2. every zone due for evaluation records raw containment
//! 3. mutually exclusive groups arbitrate on the raw results
//! 4. membership edges are published and one-shot callbacks fire

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info, trace, warn};
use rand::Rng;

use crate::config::{ConfigError, EngineConfig, ZoneOptions};
use crate::containment::{Containment, Query};
use crate::error::{ZoneError, ZoneResult};
use crate::events::{Occupant, ZoneEvent};
use crate::foundation::collections::{EntityId, PlayerId, SlotMap, ZoneId};
use crate::foundation::math::{Frame, Vec3};
use crate::geometry::{Volume, ZoneGeometry};
use crate::group::{pick_winner, Claim, GroupCoordinator, GroupSettings};
use crate::scene::{Body, Character, Part, PlayerRoster, Scene};
use crate::scheduler::Heartbeat;
use crate::spatial::{EntityKinds, Octree, OctreeSpatialQuery, SpatialQuery};
use crate::tracker::Tracker;
use crate::zone::{CallbackId, EvalContext, Zone};

/// Evaluation failure isolated to one zone and occupant
#[derive(Debug, Clone, PartialEq)]
pub struct PairError {
    /// Zone being evaluated
    pub zone: ZoneId,
    /// Occupant being evaluated
    pub occupant: Occupant,
    /// What went wrong
    pub error: ZoneError,
}

/// What one call to [`ZoneController::step`] did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Step time
    pub time: f64,
    /// Evaluation tick, unchanged when nothing was evaluated
    pub tick: u64,
    /// Whether the heartbeat fired
    pub heartbeat: bool,
    /// Zones whose debounced on-demand update ran
    pub on_demand: Vec<ZoneId>,
    /// Zones that swapped in replacement geometry
    pub geometry_refreshes: Vec<ZoneId>,
    /// Zones that recorded raw containment
    pub evaluated: Vec<ZoneId>,
    /// Published membership edges, in publish order
    pub events: Vec<ZoneEvent>,
    /// Isolated evaluation failures
    pub errors: Vec<PairError>,
}

/// Owner of every zone and the world they observe
pub struct ZoneController {
    config: EngineConfig,
    scene: Scene,
    players: PlayerRoster,
    adapter: Box<dyn SpatialQuery>,
    player_tracker: Tracker,
    item_tracker: Tracker,
    zones: SlotMap<ZoneId, Zone>,
    order: Vec<ZoneId>,
    next_registration: usize,
    groups: GroupCoordinator,
    heartbeat: Heartbeat,
    tick: u64,
    now: f64,
}

impl ZoneController {
    /// Create a controller backed by the default octree broad phase
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let adapter = OctreeSpatialQuery::new(Octree::from_config(config.octree.clone()));
        Self::with_adapter(config, Box::new(adapter))
    }

    /// Create a controller over a host-provided broad phase
    pub fn with_adapter(config: EngineConfig, adapter: Box<dyn SpatialQuery>) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "Zone controller ready (update window {}, heartbeat {})",
            config.update_queue_window, config.heartbeat_interval
        );
        Ok(Self {
            heartbeat: Heartbeat::new(config.heartbeat_interval),
            config,
            scene: Scene::new(),
            players: PlayerRoster::default(),
            adapter,
            player_tracker: Tracker::new("player"),
            item_tracker: Tracker::new("item"),
            zones: SlotMap::with_key(),
            order: Vec::new(),
            next_registration: 0,
            groups: GroupCoordinator::new(),
            tick: 0,
            now: 0.0,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scene mirror
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Connected players
    pub fn players(&self) -> &PlayerRoster {
        &self.players
    }

    /// Broad phase
    pub fn adapter(&self) -> &dyn SpatialQuery {
        self.adapter.as_ref()
    }

    /// Tracker of player characters
    pub fn player_tracker(&self) -> &Tracker {
        &self.player_tracker
    }

    /// Mutable player tracker, for lifecycle subscriptions
    pub fn player_tracker_mut(&mut self) -> &mut Tracker {
        &mut self.player_tracker
    }

    /// Tracker of followed items
    pub fn item_tracker(&self) -> &Tracker {
        &self.item_tracker
    }

    /// Mutable item tracker, for lifecycle subscriptions
    pub fn item_tracker_mut(&mut self) -> &mut Tracker {
        &mut self.item_tracker
    }

    /// Group registry
    pub fn groups(&self) -> &GroupCoordinator {
        &self.groups
    }

    /// Time of the latest step
    pub fn now(&self) -> f64 {
        self.now
    }

    // ---- scene notifications -------------------------------------------

    /// Mirror a new rigid part
    pub fn spawn_part(&mut self, part: Part) -> EntityId {
        self.spawn(Body::Part(part))
    }

    /// Mirror a new character
    pub fn spawn_character(&mut self, character: Character) -> EntityId {
        self.spawn(Body::Character(character))
    }

    fn spawn(&mut self, body: Body) -> EntityId {
        let kind = body.kind();
        let bounds = body.world_aabb();
        let id = self.scene.insert(body);
        if let Some(bounds) = bounds {
            self.adapter.insert(id, bounds, kind);
        }
        trace!("spawned {:?} as {:?}", id, kind);
        self.request_for_entity(id);
        id
    }

    /// Move a part, or a character by its root
    pub fn move_entity(&mut self, entity: EntityId, frame: Frame) -> ZoneResult<()> {
        let record = self.scene.get_mut(entity).ok_or(ZoneError::UnknownEntity(entity))?;
        match &mut record.body {
            Body::Part(part) => part.frame = frame,
            Body::Character(character) => {
                if !character.set_root_frame(frame) {
                    return Err(ZoneError::InvalidQuery(format!(
                        "character '{}' has no root part to move",
                        character.name
                    )));
                }
            }
        }
        self.refresh_entity(entity);
        Ok(())
    }

    /// Replace an entity's body, e.g. when a part is rebuilt as a character
    pub fn set_body(&mut self, entity: EntityId, body: Body) -> ZoneResult<()> {
        let kind = body.kind();
        let record = self.scene.get_mut(entity).ok_or(ZoneError::UnknownEntity(entity))?;
        record.body = body;
        if self.item_tracker.reclassify(entity, kind) || self.player_tracker.reclassify(entity, kind) {
            debug!("{:?} reclassified as {:?}", entity, kind);
        }
        self.adapter.remove(entity);
        self.refresh_entity(entity);
        Ok(())
    }

    /// The host reparented the entity out of the world
    ///
    /// Occupants it represents leave every zone right away; the returned
    /// exits were already published.
    pub fn detach(&mut self, entity: EntityId) -> ZoneResult<Vec<ZoneEvent>> {
        let record = self.scene.get_mut(entity).ok_or(ZoneError::UnknownEntity(entity))?;
        record.attached = false;
        self.adapter.remove(entity);
        debug!("detached {:?}", entity);
        Ok(self.forget_entity(entity, false))
    }

    /// Put a detached entity back into the world
    pub fn reattach(&mut self, entity: EntityId) -> ZoneResult<()> {
        let record = self.scene.get_mut(entity).ok_or(ZoneError::UnknownEntity(entity))?;
        record.attached = true;
        let kind = record.body.kind();
        // Detaching dropped the character from the player tracker, not the binding
        if self.players.player_for(entity).is_some() {
            self.player_tracker.track(entity, kind);
        }
        self.refresh_entity(entity);
        Ok(())
    }

    /// The host destroyed the entity
    pub fn destroy_entity(&mut self, entity: EntityId) -> ZoneResult<Vec<ZoneEvent>> {
        if !self.scene.contains(entity) {
            return Err(ZoneError::UnknownEntity(entity));
        }
        let exits = self.forget_entity(entity, true);
        self.adapter.remove(entity);
        self.scene.remove(entity);
        debug!("destroyed {:?}", entity);
        Ok(exits)
    }

    /// Drop every zone's view of an entity, publishing exits
    fn forget_entity(&mut self, entity: EntityId, unbind_player: bool) -> Vec<ZoneEvent> {
        let now = self.now;
        let local = self.players.local();
        let player = self.players.player_for(entity);
        let mut exits = Vec::new();

        for id in &self.order {
            let Some(zone) = self.zones.get_mut(*id) else { continue };
            exits.extend(zone.remove_occupant(Occupant::Item(entity), now, local));
            exits.extend(zone.remove_occupant(Occupant::Part(entity), now, local));
            zone.remove_interest(entity);
            if let Some(player) = player {
                exits.extend(zone.remove_occupant(Occupant::Player(player), now, local));
            }
        }

        self.item_tracker.untrack(entity);
        self.player_tracker.untrack(entity);
        if let (Some(player), true) = (player, unbind_player) {
            self.players.set_character(player, None);
        }
        exits
    }

    /// Resync the broad phase and poke zones that care about the entity
    fn refresh_entity(&mut self, entity: EntityId) {
        match (self.scene.body(entity), self.adapter.entity_data(entity)) {
            (Some(body), Some(_)) => match body.world_aabb() {
                Some(bounds) => self.adapter.update(entity, bounds),
                None => self.adapter.remove(entity),
            },
            (Some(body), None) => {
                if let Some(bounds) = body.world_aabb() {
                    self.adapter.insert(entity, bounds, body.kind());
                }
            }
            (None, _) => self.adapter.remove(entity),
        }
        self.request_for_entity(entity);
    }

    fn request_for_entity(&mut self, entity: EntityId) {
        let now = self.now;
        let is_player = self.players.player_for(entity).is_some();
        let is_part = matches!(self.scene.body(entity), Some(Body::Part(_)));
        for zone in self.zones.values_mut() {
            if is_player || (is_part && zone.part_events_enabled()) || zone.watched_items().contains(&entity) {
                zone.request_update(now);
            }
        }
    }

    fn request_all(&mut self) {
        let now = self.now;
        for zone in self.zones.values_mut() {
            zone.request_update(now);
        }
    }

    // ---- players -------------------------------------------------------

    /// Register a connected player
    pub fn add_player(&mut self, player: PlayerId) -> bool {
        let added = self.players.add(player);
        if added {
            debug!("player {:?} joined", player);
        }
        added
    }

    /// Disconnect a player, publishing their exits
    pub fn remove_player(&mut self, player: PlayerId) -> ZoneResult<Vec<ZoneEvent>> {
        if !self.players.contains(player) {
            return Err(ZoneError::UnknownPlayer(player));
        }
        let now = self.now;
        let local = self.players.local();
        let mut exits = Vec::new();
        for id in &self.order {
            if let Some(zone) = self.zones.get_mut(*id) {
                exits.extend(zone.remove_occupant(Occupant::Player(player), now, local));
            }
        }
        if let Some(character) = self.players.remove(player).flatten() {
            self.player_tracker.untrack(character);
        }
        debug!("player {:?} left", player);
        Ok(exits)
    }

    /// Bind a player to a character, or clear the binding
    pub fn set_player_character(&mut self, player: PlayerId, character: Option<EntityId>) -> ZoneResult<()> {
        if !self.players.contains(player) {
            return Err(ZoneError::UnknownPlayer(player));
        }
        if let Some(id) = character {
            let record = self.scene.get(id).ok_or(ZoneError::UnknownEntity(id))?;
            if !matches!(record.body, Body::Character(_)) {
                return Err(ZoneError::InvalidQuery(format!(
                    "player {:?} can only drive a character, '{}' is a part",
                    player,
                    record.body.name()
                )));
            }
        }
        if let Some(previous) = self.players.set_character(player, character) {
            self.player_tracker.untrack(previous);
        }
        if let Some(id) = character {
            self.player_tracker.track(id, EntityKinds::CHARACTER);
        }
        self.request_all();
        Ok(())
    }

    /// Designate the player running on this machine
    pub fn set_local_player(&mut self, player: Option<PlayerId>) {
        self.players.set_local(player);
    }

    // ---- zones ---------------------------------------------------------

    /// Build a zone from explicit volumes with the configured defaults
    pub fn create_zone(&mut self, name: impl Into<String>, volumes: Vec<Volume>) -> ZoneResult<ZoneId> {
        let options = self.config.zone_defaults;
        self.create_zone_with(name, volumes, options)
    }

    /// Build a zone from explicit volumes
    pub fn create_zone_with(
        &mut self,
        name: impl Into<String>,
        volumes: Vec<Volume>,
        options: ZoneOptions,
    ) -> ZoneResult<ZoneId> {
        let geometry = ZoneGeometry::capture(volumes)?;
        Ok(self.insert_zone(name.into(), geometry, options))
    }

    /// Build a zone from one oriented box, subdivided above the part size limit
    pub fn create_zone_from_region(&mut self, name: impl Into<String>, frame: Frame, size: Vec3) -> ZoneResult<ZoneId> {
        let geometry = ZoneGeometry::from_region(frame, size, self.config.max_part_size)?;
        let options = self.config.zone_defaults;
        Ok(self.insert_zone(name.into(), geometry, options))
    }

    fn insert_zone(&mut self, name: String, geometry: ZoneGeometry, options: ZoneOptions) -> ZoneId {
        let registration = self.next_registration;
        self.next_registration += 1;
        let window = self.config.update_queue_window;
        let id = self
            .zones
            .insert_with_key(|id| Zone::new(id, name, registration, geometry, options, window));
        self.order.push(id);
        if let Some(zone) = self.zones.get(id) {
            debug!(
                "zone '{}' created with {} volumes, volume {:.1}",
                zone.name(),
                zone.geometry().len(),
                zone.volume()
            );
        }
        id
    }

    /// Look up a zone
    pub fn zone(&self, zone: ZoneId) -> ZoneResult<&Zone> {
        self.zones.get(zone).ok_or(ZoneError::UnknownZone(zone))
    }

    /// Mutable zone lookup, for settings and subscriptions
    pub fn zone_mut(&mut self, zone: ZoneId) -> ZoneResult<&mut Zone> {
        self.zones.get_mut(zone).ok_or(ZoneError::UnknownZone(zone))
    }

    /// Zones in registration order
    pub fn zones(&self) -> impl Iterator<Item = &Zone> + '_ {
        self.order.iter().filter_map(|id| self.zones.get(*id))
    }

    /// Replace a zone's volumes; swapped in by the next update
    pub fn set_zone_volumes(&mut self, zone: ZoneId, volumes: Vec<Volume>) -> ZoneResult<()> {
        let now = self.now;
        self.zone_mut(zone)?.set_volumes(volumes, now)
    }

    /// Move one of a zone's volumes; swapped in by the next update
    pub fn set_zone_volume_frame(&mut self, zone: ZoneId, index: usize, frame: Frame) -> ZoneResult<()> {
        let now = self.now;
        self.zone_mut(zone)?.set_volume_frame(index, frame, now)
    }

    /// Tear a zone down; false when it was already gone
    ///
    /// Pending callbacks are dropped without running and no exits are
    /// published.
    pub fn destroy_zone(&mut self, zone: ZoneId) -> bool {
        let Some(mut removed) = self.zones.remove(zone) else {
            return false;
        };
        for entity in removed.destroy() {
            self.item_tracker.release(entity);
        }
        self.groups.unbind(zone);
        self.order.retain(|id| *id != zone);
        true
    }

    // ---- one-shot queries ----------------------------------------------

    /// Whether a world point is inside the zone
    pub fn find_point(&self, zone: ZoneId, point: Vec3) -> ZoneResult<Containment> {
        self.zone(zone)?.find_point(point)
    }

    /// Whether a part, not necessarily in the scene, is inside the zone
    pub fn find_part(&self, zone: ZoneId, part: &Part) -> ZoneResult<Containment> {
        let zone = self.zone(zone)?;
        let detection = zone.options().enter_detection.resolve(
            zone.volume(),
            part.bounding_volume(),
            self.config.automatic_volume_ratio,
        );
        zone.containment(Query::Part(part), detection)
    }

    /// Whether a scene entity is inside the zone; ignores group arbitration
    pub fn find_item(&self, zone: ZoneId, item: EntityId) -> ZoneResult<Containment> {
        let body = self.scene.body(item).ok_or(ZoneError::UnknownEntity(item))?;
        let tracked = self.item_tracker.combined_total_volume(&self.scene);
        self.find_body(zone, body, tracked)
    }

    /// Whether a player's character is inside the zone
    pub fn find_player(&self, zone: ZoneId, player: PlayerId) -> ZoneResult<Containment> {
        if !self.players.contains(player) {
            return Err(ZoneError::UnknownPlayer(player));
        }
        let Some(body) = self.players.character(player).and_then(|c| self.scene.body(c)) else {
            self.zone(zone)?;
            return Ok(Containment::outside());
        };
        let tracked = self.player_tracker.combined_total_volume(&self.scene);
        self.find_body(zone, body, tracked)
    }

    /// Whether the local player's character is inside the zone
    pub fn find_local_player(&self, zone: ZoneId) -> ZoneResult<Containment> {
        match self.players.local() {
            Some(player) => self.find_player(zone, player),
            None => self.zone(zone).map(|_| Containment::outside()),
        }
    }

    fn find_body(&self, zone: ZoneId, body: &Body, tracked_volume: f32) -> ZoneResult<Containment> {
        let zone = self.zone(zone)?;
        let detection = zone.options().enter_detection.resolve(
            zone.volume(),
            tracked_volume,
            self.config.automatic_volume_ratio,
        );
        zone.containment(Query::from(body), detection)
    }

    /// Random point inside the zone using the thread RNG
    pub fn random_point(&self, zone: ZoneId) -> ZoneResult<Option<(Vec3, Vec<usize>)>> {
        Ok(self.zone(zone)?.random_point(self.config.random_point_attempts))
    }

    /// Random point inside the zone from a caller-supplied RNG
    pub fn random_point_with<R: Rng>(&self, zone: ZoneId, rng: &mut R) -> ZoneResult<Option<(Vec3, Vec<usize>)>> {
        Ok(self
            .zone(zone)?
            .random_point_with(rng, self.config.random_point_attempts))
    }

    // ---- tracking and callbacks ----------------------------------------

    /// Follow an item in one zone; false when already followed there
    pub fn track_item(&mut self, zone: ZoneId, item: EntityId) -> ZoneResult<bool> {
        let kind = self
            .scene
            .get(item)
            .map(|e| e.body.kind())
            .ok_or(ZoneError::UnknownEntity(item))?;
        let now = self.now;
        let zone = self.zones.get_mut(zone).ok_or(ZoneError::UnknownZone(zone))?;
        if !zone.add_interest(item) {
            return Ok(false);
        }
        zone.request_update(now);
        self.item_tracker.retain(item, kind);
        Ok(true)
    }

    /// Stop following an item in one zone
    ///
    /// If the item was inside its exit is published immediately; callbacks
    /// waiting on it are cancelled.
    pub fn untrack_item(&mut self, zone: ZoneId, item: EntityId) -> ZoneResult<Vec<ZoneEvent>> {
        let now = self.now;
        let local = self.players.local();
        let zone = self.zones.get_mut(zone).ok_or(ZoneError::UnknownZone(zone))?;
        let exits = zone.remove_occupant(Occupant::Item(item), now, local);
        if zone.remove_interest(item) {
            self.item_tracker.release(item);
        }
        Ok(exits)
    }

    /// Run `callback` once the item is inside the zone
    ///
    /// Runs right away (returning `None`) when the item is already inside.
    pub fn on_item_enter(
        &mut self,
        zone: ZoneId,
        item: EntityId,
        callback: impl FnOnce() + 'static,
    ) -> ZoneResult<Option<CallbackId>> {
        self.register_callback(zone, item, true, Box::new(callback))
    }

    /// Run `callback` once the item is outside the zone
    ///
    /// Runs right away (returning `None`) when the item is already outside.
    pub fn on_item_exit(
        &mut self,
        zone: ZoneId,
        item: EntityId,
        callback: impl FnOnce() + 'static,
    ) -> ZoneResult<Option<CallbackId>> {
        self.register_callback(zone, item, false, Box::new(callback))
    }

    fn register_callback(
        &mut self,
        zone: ZoneId,
        item: EntityId,
        on_enter: bool,
        callback: Box<dyn FnOnce()>,
    ) -> ZoneResult<Option<CallbackId>> {
        let inside = match self.zone(zone)?.state(Occupant::Item(item)) {
            Some(state) => state.inside,
            None => self.find_item(zone, item)?.inside,
        };
        if inside == on_enter {
            callback();
            return Ok(None);
        }
        let now = self.now;
        let zone = self.zone_mut(zone)?;
        let id = zone.add_callback(item, on_enter, callback);
        zone.request_update(now);
        Ok(Some(id))
    }

    /// Drop a pending callback without running it
    pub fn cancel_callback(&mut self, zone: ZoneId, callback: CallbackId) -> ZoneResult<bool> {
        Ok(self.zone_mut(zone)?.cancel_callback(callback))
    }

    // ---- groups --------------------------------------------------------

    /// Register or replace a group's settings
    pub fn set_group(&mut self, name: impl Into<String>, settings: GroupSettings) {
        self.groups.set_group(name, settings);
        self.request_all();
    }

    /// Join a zone to a group; arbitration applies from the next step
    pub fn bind_to_group(&mut self, zone: ZoneId, name: impl Into<String>) -> ZoneResult<()> {
        let now = self.now;
        self.zone_mut(zone)?.request_update(now);
        self.groups.bind(zone, name);
        Ok(())
    }

    /// Take a zone out of its group
    pub fn unbind_from_group(&mut self, zone: ZoneId) -> ZoneResult<Option<String>> {
        let now = self.now;
        self.zone_mut(zone)?.request_update(now);
        Ok(self.groups.unbind(zone))
    }

    // ---- evaluation ----------------------------------------------------

    /// Advance to `now`: run due updates, evaluate, arbitrate and publish
    pub fn step(&mut self, now: f64) -> StepReport {
        self.now = now;
        let heartbeat = self.heartbeat.due(now);
        let mut report = StepReport {
            time: now,
            tick: self.tick,
            heartbeat,
            ..StepReport::default()
        };

        let mut due = Vec::new();
        for id in &self.order {
            let Some(zone) = self.zones.get_mut(*id) else { continue };
            let on_demand = zone.poll_update(now);
            let refresh = on_demand || (heartbeat && !zone.options().auto_update);
            if refresh && zone.apply_pending_geometry() {
                report.geometry_refreshes.push(*id);
            }
            if on_demand {
                report.on_demand.push(*id);
            }
            if on_demand || heartbeat {
                due.push(*id);
            }
        }
        if due.is_empty() {
            return report;
        }

        self.tick += 1;
        report.tick = self.tick;
        let ctx = EvalContext {
            scene: &self.scene,
            roster: &self.players,
            adapter: self.adapter.as_ref(),
            item_volume: self.item_tracker.combined_total_volume(&self.scene),
            player_volume: self.player_tracker.combined_total_volume(&self.scene),
            automatic_volume_ratio: self.config.automatic_volume_ratio,
        };
        for id in &due {
            let Some(zone) = self.zones.get_mut(*id) else { continue };
            for (occupant, error) in zone.evaluate(&ctx, self.tick) {
                warn!("zone '{}' failed to evaluate {:?}: {}", zone.name(), occupant, error);
                report.errors.push(PairError {
                    zone: *id,
                    occupant,
                    error,
                });
            }
        }
        report.evaluated = due;

        let suppressed = self.arbitrate();
        let none = HashSet::new();
        let local = self.players.local();
        for id in &self.order {
            if let Some(zone) = self.zones.get_mut(*id) {
                report
                    .events
                    .extend(zone.publish(now, suppressed.get(id).unwrap_or(&none), local));
            }
        }
        for id in &self.order {
            if let Some(zone) = self.zones.get_mut(*id) {
                zone.dispatch();
            }
        }

        if !report.events.is_empty() {
            debug!("tick {}: published {} events", self.tick, report.events.len());
        }
        report
    }

    /// Occupants each zone must treat as outside for events this tick
    fn arbitrate(&self) -> HashMap<ZoneId, HashSet<Occupant>> {
        let mut suppressed: HashMap<ZoneId, HashSet<Occupant>> = HashMap::new();
        for (name, members) in self.groups.exclusive_groups() {
            let mut claims: BTreeMap<Occupant, Vec<Claim>> = BTreeMap::new();
            for id in members {
                let Some(zone) = self.zones.get(*id) else { continue };
                for (occupant, state) in zone.states().filter(|(_, s)| s.raw_inside) {
                    claims.entry(occupant).or_default().push(Claim {
                        zone: *id,
                        registration: zone.registration(),
                        entered_at: state.entered_at,
                    });
                }
            }
            for (occupant, claims) in claims.into_iter().filter(|(_, c)| c.len() > 1) {
                let winner = pick_winner(&claims);
                trace!("group '{}': {:?} goes to {:?}", name, occupant, winner);
                for claim in claims.iter().filter(|c| Some(c.zone) != winner) {
                    suppressed.entry(claim.zone).or_default().insert(occupant);
                }
            }
        }
        suppressed
    }
}

impl std::fmt::Debug for ZoneController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneController")
            .field("zones", &self.order.len())
            .field("entities", &self.scene.len())
            .field("tick", &self.tick)
            .field("now", &self.now)
            .finish()
    }
}
