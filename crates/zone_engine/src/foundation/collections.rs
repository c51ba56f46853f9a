//! Stable handle types
//!
//! Zones and scene entities are stored in slot maps so that identifiers
//! survive removal of other entries and stale handles are detected.

pub use slotmap::{SlotMap, SecondaryMap};

slotmap::new_key_type! {
    /// Handle to a zone owned by a [`ZoneController`](crate::ZoneController)
    pub struct ZoneId;

    /// Handle to a part or character mirrored in the [`Scene`](crate::scene::Scene)
    pub struct EntityId;
}

/// Identifier of a connected player, assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);
