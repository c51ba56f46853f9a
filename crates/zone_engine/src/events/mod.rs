//! Event system for zone and tracker notifications
//!
//! - Handlers register per event kind and only see events of that kind
//! - Delivery is synchronous, in registration order, to every handler
//! - Events raised mid-evaluation are queued and delivered on `dispatch`,
//!   so handlers always observe a settled state
//! - Registration returns a [`Connection`] used to disconnect later

use std::collections::HashMap;
use std::hash::Hash;

use crate::foundation::collections::{EntityId, PlayerId, ZoneId};

/// Anything deliverable through an [`EventSystem`]
pub trait Event {
    /// Key handlers register under
    type Kind: Copy + Eq + Hash;

    /// Which handlers receive this event
    fn kind(&self) -> Self::Kind;
}

/// Event handler; closures taking `&E` implement it directly
pub trait EventHandler<E> {
    /// Receive one event
    fn on_event(&mut self, event: &E);
}

impl<E, F: FnMut(&E)> EventHandler<E> for F {
    fn on_event(&mut self, event: &E) {
        self(event)
    }
}

/// Handle to one registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection(u64);

/// Kind-keyed multicast with an immediate queue
pub struct EventSystem<E: Event> {
    queue: Vec<E>,
    handlers: HashMap<E::Kind, Vec<(Connection, Box<dyn EventHandler<E>>)>>,
    next_connection: u64,
}

impl<E: Event> EventSystem<E> {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            handlers: HashMap::new(),
            next_connection: 0,
        }
    }

    /// Register a handler for one event kind
    pub fn register_handler(&mut self, kind: E::Kind, handler: impl EventHandler<E> + 'static) -> Connection {
        let connection = Connection(self.next_connection);
        self.next_connection += 1;
        self.handlers
            .entry(kind)
            .or_default()
            .push((connection, Box::new(handler)));
        connection
    }

    /// Remove a handler; false when it was already gone
    pub fn disconnect(&mut self, connection: Connection) -> bool {
        for handlers in self.handlers.values_mut() {
            if let Some(index) = handlers.iter().position(|(c, _)| *c == connection) {
                handlers.remove(index);
                return true;
            }
        }
        false
    }

    /// Number of handlers registered for `kind`
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Queue an event for the next `dispatch`
    pub fn send(&mut self, event: E) {
        self.queue.push(event);
    }

    /// Deliver queued events in the order they were sent; returns how many
    pub fn dispatch(&mut self) -> usize {
        let queued = std::mem::take(&mut self.queue);
        let count = queued.len();
        for event in &queued {
            self.publish(event);
        }
        count
    }

    /// Deliver one event right away, bypassing the queue
    pub fn publish(&mut self, event: &E) {
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for (_, handler) in handlers.iter_mut() {
                handler.on_event(event);
            }
        }
    }

    /// Events waiting for dispatch
    pub fn pending(&self) -> &[E] {
        &self.queue
    }

    /// Drop queued events and every handler
    pub fn clear(&mut self) {
        self.queue.clear();
        self.handlers.clear();
    }
}

impl<E: Event> Default for EventSystem<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> std::fmt::Debug for EventSystem<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("queued", &self.queue.len())
            .field("handlers", &self.handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Who crossed a zone boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Occupant {
    /// A tracked item (part or character)
    Item(EntityId),
    /// Any part in the scene, evaluated only while part events have subscribers
    Part(EntityId),
    /// A connected player, through their character
    Player(PlayerId),
}

/// Zone event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneEventKind {
    /// Tracked item became inside
    ItemEntered,
    /// Tracked item stopped being inside
    ItemExited,
    /// Scene part became inside
    PartEntered,
    /// Scene part stopped being inside
    PartExited,
    /// Player character became inside
    PlayerEntered,
    /// Player character stopped being inside
    PlayerExited,
    /// Local player character became inside
    LocalPlayerEntered,
    /// Local player character stopped being inside
    LocalPlayerExited,
}

impl ZoneEventKind {
    /// Kind raised when `occupant` enters (`entered = true`) or exits
    pub fn for_occupant(occupant: Occupant, entered: bool) -> Self {
        match (occupant, entered) {
            (Occupant::Item(_), true) => Self::ItemEntered,
            (Occupant::Item(_), false) => Self::ItemExited,
            (Occupant::Part(_), true) => Self::PartEntered,
            (Occupant::Part(_), false) => Self::PartExited,
            (Occupant::Player(_), true) => Self::PlayerEntered,
            (Occupant::Player(_), false) => Self::PlayerExited,
        }
    }

    /// Whether this kind marks an entry
    pub fn is_enter(self) -> bool {
        matches!(
            self,
            Self::ItemEntered | Self::PartEntered | Self::PlayerEntered | Self::LocalPlayerEntered
        )
    }
}

/// A published membership edge
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneEvent {
    /// Event kind
    pub kind: ZoneEventKind,
    /// Zone whose membership changed
    pub zone: ZoneId,
    /// Who crossed
    pub occupant: Occupant,
    /// Matched volume indices at entry; empty for exits
    pub volumes: Vec<usize>,
    /// Step time the edge was observed at
    pub timestamp: f64,
}

impl Event for ZoneEvent {
    type Kind = ZoneEventKind;

    fn kind(&self) -> ZoneEventKind {
        self.kind
    }
}

/// Tracker lifecycle kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerEventKind {
    /// Entity joined the tracked set
    ItemAdded,
    /// Entity left the tracked set
    ItemRemoved,
}

/// Tracker lifecycle notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerEvent {
    /// Event kind
    pub kind: TrackerEventKind,
    /// Affected entity
    pub entity: EntityId,
}

impl Event for TrackerEvent {
    type Kind = TrackerEventKind;

    fn kind(&self) -> TrackerEventKind {
        self.kind
    }
}
