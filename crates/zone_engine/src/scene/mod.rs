//! Engine-side mirror of host scene entities
//!
//! The host owns the real objects; it reports spawns, moves, detaches and
//! destruction to the [`ZoneController`](crate::ZoneController), which keeps
//! this mirror and the broad-phase adapter in step.

mod body;

use std::collections::BTreeMap;

pub use body::{Body, Character, Part, HEAD_PART, IGNORED_BODY_PARTS, ROOT_PART};

use crate::foundation::collections::{EntityId, PlayerId, SlotMap};

/// Scene record for one host entity
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntity {
    /// Current shape and placement
    pub body: Body,
    /// False once the host has reparented the entity out of the world
    pub attached: bool,
    /// Spawn sequence number; unlike the handle it never repeats
    pub registration: u64,
}

/// Mirror of host entities keyed by stable handles
#[derive(Debug, Default)]
pub struct Scene {
    entities: SlotMap<EntityId, SceneEntity>,
    next_registration: u64,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attached entity
    pub fn insert(&mut self, body: Body) -> EntityId {
        let registration = self.next_registration;
        self.next_registration += 1;
        self.entities.insert(SceneEntity { body, attached: true, registration })
    }

    /// Drop an entity, returning its last record
    pub fn remove(&mut self, id: EntityId) -> Option<SceneEntity> {
        self.entities.remove(id)
    }

    /// Look up an entity
    pub fn get(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.get(id)
    }

    /// Mutable lookup
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut SceneEntity> {
        self.entities.get_mut(id)
    }

    /// Body of an attached entity
    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.entities.get(id).filter(|e| e.attached).map(|e| &e.body)
    }

    /// Spawn sequence number of a live entity
    pub fn registration(&self, id: EntityId) -> Option<u64> {
        self.entities.get(id).map(|e| e.registration)
    }

    /// Whether the handle is live
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of entities, attached or not
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entity is mirrored
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Seat {
    character: Option<EntityId>,
    joined: u64,
}

/// Connected players and the character each one currently drives
#[derive(Debug, Default)]
pub struct PlayerRoster {
    players: BTreeMap<PlayerId, Seat>,
    local: Option<PlayerId>,
    next_join: u64,
}

impl PlayerRoster {
    /// Register a player; returns false when already present
    pub fn add(&mut self, player: PlayerId) -> bool {
        if self.players.contains_key(&player) {
            return false;
        }
        self.players.insert(player, Seat { character: None, joined: self.next_join });
        self.next_join += 1;
        true
    }

    /// Forget a player and its character binding
    pub fn remove(&mut self, player: PlayerId) -> Option<Option<EntityId>> {
        if self.local == Some(player) {
            self.local = None;
        }
        self.players.remove(&player).map(|seat| seat.character)
    }

    /// Whether the player is connected
    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    /// Bind or clear a player's character; returns the previous binding
    pub fn set_character(&mut self, player: PlayerId, character: Option<EntityId>) -> Option<EntityId> {
        self.players
            .get_mut(&player)
            .and_then(|seat| std::mem::replace(&mut seat.character, character))
    }

    /// The character a player currently drives
    pub fn character(&self, player: PlayerId) -> Option<EntityId> {
        self.players.get(&player).and_then(|seat| seat.character)
    }

    /// Join sequence number of a connected player
    pub fn registration(&self, player: PlayerId) -> Option<u64> {
        self.players.get(&player).map(|seat| seat.joined)
    }

    /// Player driving `character`, if any
    pub fn player_for(&self, character: EntityId) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|(_, seat)| seat.character == Some(character))
            .map(|(p, _)| *p)
    }

    /// Designate the player running on this machine
    pub fn set_local(&mut self, player: Option<PlayerId>) {
        self.local = player.filter(|p| self.players.contains_key(p));
    }

    /// The player running on this machine
    pub fn local(&self) -> Option<PlayerId> {
        self.local
    }

    /// Players in id order with their characters
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, Option<EntityId>)> + '_ {
        self.players.iter().map(|(p, seat)| (*p, seat.character))
    }
}
