//! Per-occupant membership state and pending one-shot callbacks

use crate::containment::Containment;
use crate::foundation::collections::EntityId;

/// Membership of one occupant in one zone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityState {
    /// Membership as last published through events
    pub inside: bool,
    /// Published membership before the latest edge
    pub previous: bool,
    /// Geometric membership at the latest evaluation, before arbitration
    pub raw_inside: bool,
    /// Tick at which `raw_inside` last turned true
    pub entered_at: u64,
    /// Volumes matched at the latest evaluation
    pub volumes: Vec<usize>,
    /// Tick of the latest evaluation
    pub last_evaluated: u64,
    /// Registration sequence of the occupant; orders same-tick events
    pub registration: u64,
}

impl EntityState {
    /// Store a raw containment result
    pub fn record(&mut self, containment: Containment, tick: u64) {
        if containment.inside && !self.raw_inside {
            self.entered_at = tick;
        }
        self.raw_inside = containment.inside;
        self.volumes = containment.volumes;
        self.last_evaluated = tick;
    }

    /// Move published membership to `target`; true on an edge
    pub fn publish(&mut self, target: bool) -> bool {
        if self.inside == target {
            return false;
        }
        self.previous = self.inside;
        self.inside = target;
        true
    }
}

/// Handle to a queued one-shot callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub(crate) u64);

pub(crate) struct PendingCallback {
    pub id: CallbackId,
    pub entity: EntityId,
    pub on_enter: bool,
    pub callback: Box<dyn FnOnce()>,
}

impl std::fmt::Debug for PendingCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCallback")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .field("on_enter", &self.on_enter)
            .finish()
    }
}

/// Pull every callback waiting on `entity` crossing in direction `on_enter`
pub(crate) fn take_due(callbacks: &mut Vec<PendingCallback>, entity: EntityId, on_enter: bool) -> Vec<PendingCallback> {
    let (due, keep) = std::mem::take(callbacks)
        .into_iter()
        .partition(|c| c.entity == entity && c.on_enter == on_enter);
    *callbacks = keep;
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entered_at_only_moves_on_raw_entry() {
        let mut state = EntityState::default();
        state.record(Containment { inside: true, volumes: vec![0] }, 3);
        state.record(Containment { inside: true, volumes: vec![0, 1] }, 4);
        assert_eq!(state.entered_at, 3);
        assert_eq!(state.last_evaluated, 4);
        state.record(Containment::outside(), 5);
        state.record(Containment { inside: true, volumes: vec![1] }, 6);
        assert_eq!(state.entered_at, 6);
    }

    #[test]
    fn test_publish_reports_edges_once() {
        let mut state = EntityState::default();
        assert!(state.publish(true));
        assert!(!state.publish(true));
        assert!(state.previous == false && state.inside);
        assert!(state.publish(false));
        assert!(state.previous);
    }
}
