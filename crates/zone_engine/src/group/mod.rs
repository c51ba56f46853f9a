//! Named zone groups and mutual-exclusion arbitration
//!
//! Zones refer to their group by name. The coordinator maps each name to
//! its settings and its live member set; membership changes only through
//! `bind`/`unbind` and is read-only while a step arbitrates.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ZoneError, ZoneResult};
use crate::foundation::collections::ZoneId;

/// Policy shared by every zone in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSettings {
    /// An occupant may be published inside at most one member zone
    pub mutually_exclusive: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self { mutually_exclusive: true }
    }
}

/// One zone's raw claim on an occupant during arbitration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Claiming zone
    pub zone: ZoneId,
    /// Zone registration index, lower registered earlier
    pub registration: usize,
    /// Tick at which the occupant last became raw-inside this zone
    pub entered_at: u64,
}

/// Zone whose claim wins: most recently entered, then earliest registered
pub fn pick_winner(claims: &[Claim]) -> Option<ZoneId> {
    claims
        .iter()
        .max_by(|a, b| {
            a.entered_at
                .cmp(&b.entered_at)
                .then_with(|| b.registration.cmp(&a.registration))
        })
        .map(|claim| claim.zone)
}

/// Registry of group settings and members
#[derive(Debug, Default)]
pub struct GroupCoordinator {
    settings: HashMap<String, GroupSettings>,
    members: HashMap<String, Vec<ZoneId>>,
    bindings: HashMap<ZoneId, String>,
}

impl GroupCoordinator {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a group's settings
    pub fn set_group(&mut self, name: impl Into<String>, settings: GroupSettings) {
        let name = name.into();
        debug!("group '{}' set to {:?}", name, settings);
        self.settings.insert(name, settings);
    }

    /// Forget a group's settings; members stay bound but go unarbitrated
    pub fn remove_group(&mut self, name: &str) -> bool {
        self.settings.remove(name).is_some()
    }

    /// Settings for `name`
    pub fn settings(&self, name: &str) -> ZoneResult<&GroupSettings> {
        self.settings
            .get(name)
            .ok_or_else(|| ZoneError::UnboundGroup(name.to_string()))
    }

    /// Join `zone` to `name`, leaving any previous group
    ///
    /// Binding to a name without settings is allowed and reported; the
    /// zone is simply not arbitrated until settings arrive.
    pub fn bind(&mut self, zone: ZoneId, name: impl Into<String>) {
        let name = name.into();
        self.unbind(zone);
        if let Err(err) = self.settings(&name) {
            warn!("{err}; zone {:?} joins without arbitration", zone);
        }
        self.members.entry(name.clone()).or_default().push(zone);
        self.bindings.insert(zone, name);
    }

    /// Leave the current group, returning its name
    pub fn unbind(&mut self, zone: ZoneId) -> Option<String> {
        let name = self.bindings.remove(&zone)?;
        if let Some(members) = self.members.get_mut(&name) {
            members.retain(|z| *z != zone);
            if members.is_empty() {
                self.members.remove(&name);
            }
        }
        Some(name)
    }

    /// Group the zone belongs to
    pub fn group_of(&self, zone: ZoneId) -> Option<&str> {
        self.bindings.get(&zone).map(String::as_str)
    }

    /// Members of a group in bind order
    pub fn members(&self, name: &str) -> &[ZoneId] {
        self.members.get(name).map_or(&[], Vec::as_slice)
    }

    /// Member lists of every group that arbitrates, in name order
    pub fn exclusive_groups(&self) -> Vec<(&str, &[ZoneId])> {
        let mut groups: Vec<_> = self
            .members
            .iter()
            .filter(|(name, members)| {
                members.len() > 1 && self.settings(name).map_or(false, |s| s.mutually_exclusive)
            })
            .map(|(name, members)| (name.as_str(), members.as_slice()))
            .collect();
        groups.sort_unstable_by_key(|(name, _)| *name);
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::SlotMap;

    fn zones(n: usize) -> Vec<ZoneId> {
        let mut map: SlotMap<ZoneId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_most_recent_entry_wins() {
        let ids = zones(2);
        let claims = [
            Claim { zone: ids[0], registration: 0, entered_at: 3 },
            Claim { zone: ids[1], registration: 1, entered_at: 7 },
        ];
        assert_eq!(pick_winner(&claims), Some(ids[1]));
    }

    #[test]
    fn test_tie_goes_to_earlier_registration() {
        let ids = zones(3);
        let claims = [
            Claim { zone: ids[2], registration: 2, entered_at: 5 },
            Claim { zone: ids[1], registration: 1, entered_at: 5 },
            Claim { zone: ids[0], registration: 0, entered_at: 4 },
        ];
        assert_eq!(pick_winner(&claims), Some(ids[1]));
        assert_eq!(pick_winner(&[]), None);
    }

    #[test]
    fn test_bind_moves_between_groups() {
        let ids = zones(2);
        let mut groups = GroupCoordinator::new();
        groups.set_group("arena", GroupSettings::default());
        groups.bind(ids[0], "arena");
        groups.bind(ids[1], "arena");
        assert_eq!(groups.members("arena"), &ids[..]);
        assert_eq!(groups.exclusive_groups().len(), 1);

        groups.bind(ids[0], "lobby");
        assert_eq!(groups.group_of(ids[0]), Some("lobby"));
        assert_eq!(groups.members("arena"), &ids[1..]);
        assert!(groups.exclusive_groups().is_empty());
    }

    #[test]
    fn test_unbound_group_is_not_arbitrated() {
        let ids = zones(2);
        let mut groups = GroupCoordinator::new();
        groups.bind(ids[0], "nowhere");
        groups.bind(ids[1], "nowhere");
        assert_eq!(groups.settings("nowhere"), Err(ZoneError::UnboundGroup("nowhere".into())));
        assert!(groups.exclusive_groups().is_empty());
        assert_eq!(groups.unbind(ids[0]).as_deref(), Some("nowhere"));
        assert_eq!(groups.unbind(ids[0]), None);
    }
}
