//! Per-group save status tracking
//!
//! Each preference group owns one slot in a [`StatusTable`]. A slot moves
//! `idle → loading → success → idle` on success and `idle → loading → idle`
//! on failure. A slot that is `loading` refuses a second save.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Independently saved preference groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    /// Global notification switch
    Notifications,
    /// Quiet hours
    Dnd,
    /// Snooze timer
    Snooze,
}

impl GroupKey {
    /// Every group, in display order
    pub const ALL: [GroupKey; 3] = [GroupKey::Notifications, GroupKey::Dnd, GroupKey::Snooze];

    /// Wire/display name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GroupKey::Notifications => "notifications",
            GroupKey::Dnd => "dnd",
            GroupKey::Snooze => "snooze",
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notifications" => Ok(GroupKey::Notifications),
            "dnd" => Ok(GroupKey::Dnd),
            "snooze" => Ok(GroupKey::Snooze),
            other => Err(format!("unknown preference group: {other}")),
        }
    }
}

/// UI-visible save state of one group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// A save is in flight
    Loading,
    /// The last save succeeded and is being displayed
    Success,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Loading => "loading",
            SaveStatus::Success => "success",
        })
    }
}

/// Illegal status table operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The transition is not part of the status lifecycle
    #[error("illegal transition for {group}: {from} -> {to}")]
    IllegalTransition {
        /// Group being transitioned
        group: GroupKey,
        /// Current status
        from: SaveStatus,
        /// Requested status
        to: SaveStatus,
    },

    /// The ticket belongs to an older save of the same group
    #[error("stale save ticket for {0}")]
    StaleTicket(GroupKey),
}

/// Statuses reachable from `from`
#[must_use]
pub fn allowed_transitions(from: SaveStatus) -> &'static [SaveStatus] {
    match from {
        SaveStatus::Idle => &[SaveStatus::Loading],
        SaveStatus::Loading => &[SaveStatus::Success, SaveStatus::Idle],
        SaveStatus::Success => &[SaveStatus::Idle, SaveStatus::Loading],
    }
}

/// Check a single transition against the lifecycle
#[must_use]
pub fn is_allowed(from: SaveStatus, to: SaveStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Proof that the holder started the current save of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    group: GroupKey,
    generation: u64,
}

impl SaveTicket {
    /// Group the ticket was issued for
    #[inline]
    #[must_use]
    pub fn group(self) -> GroupKey {
        self.group
    }

    /// Monotonic save counter of the group at issue time
    #[inline]
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    status: SaveStatus,
    generation: u64,
}

/// Tagged-state table mapping each group to its save status
#[derive(Debug, Clone)]
pub struct StatusTable {
    slots: BTreeMap<GroupKey, Slot>,
}

impl Default for StatusTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTable {
    /// Table with every group idle
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: GroupKey::ALL
                .into_iter()
                .map(|group| (group, Slot::default()))
                .collect(),
        }
    }

    /// Current status of `group`
    #[must_use]
    pub fn status(&self, group: GroupKey) -> SaveStatus {
        self.slots
            .get(&group)
            .map(|slot| slot.status)
            .unwrap_or_default()
    }

    /// Status of every group
    #[must_use]
    pub fn snapshot(&self) -> Vec<(GroupKey, SaveStatus)> {
        self.slots
            .iter()
            .map(|(group, slot)| (*group, slot.status))
            .collect()
    }

    /// Start a save for `group`
    ///
    /// # Errors
    /// - `SyncError::ConcurrentSaveRejected` if the group is already loading
    pub fn begin(&mut self, group: GroupKey) -> Result<SaveTicket, SyncError> {
        let slot = self.slots.entry(group).or_default();
        if slot.status == SaveStatus::Loading {
            return Err(SyncError::ConcurrentSaveRejected { group });
        }
        slot.status = SaveStatus::Loading;
        slot.generation += 1;
        Ok(SaveTicket {
            group,
            generation: slot.generation,
        })
    }

    /// Finish the save identified by `ticket`
    ///
    /// Moves the slot to `success` or straight back to `idle`.
    ///
    /// # Errors
    /// - `TransitionError::StaleTicket` if a newer save of the group started
    /// - `TransitionError::IllegalTransition` if the slot is not `loading`
    pub fn settle(&mut self, ticket: SaveTicket, succeeded: bool) -> Result<SaveStatus, TransitionError> {
        let to = if succeeded {
            SaveStatus::Success
        } else {
            SaveStatus::Idle
        };
        self.transition(ticket, to)
    }

    /// End the success display of the save identified by `ticket`
    ///
    /// Returns `Ok(false)` without touching the slot when a newer save has
    /// started since, or the slot already left `success`.
    ///
    /// # Errors
    /// Only if the table is inconsistent; stale tickets are not an error.
    pub fn expire_success(&mut self, ticket: SaveTicket) -> Result<bool, TransitionError> {
        match self.slots.get(&ticket.group) {
            Some(slot) if slot.generation == ticket.generation && slot.status == SaveStatus::Success => {
                self.transition(ticket, SaveStatus::Idle).map(|_| true)
            }
            _ => Ok(false),
        }
    }

    fn transition(&mut self, ticket: SaveTicket, to: SaveStatus) -> Result<SaveStatus, TransitionError> {
        let slot = self.slots.entry(ticket.group).or_default();
        if slot.generation != ticket.generation {
            return Err(TransitionError::StaleTicket(ticket.group));
        }
        if !is_allowed(slot.status, to) {
            return Err(TransitionError::IllegalTransition {
                group: ticket.group,
                from: slot.status,
                to,
            });
        }
        slot.status = to;
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn groups_start_idle() {
        let table = StatusTable::new();
        for group in GroupKey::ALL {
            assert_eq!(table.status(group), SaveStatus::Idle);
        }
    }

    #[test]
    fn loading_group_rejects_second_save() {
        let mut table = StatusTable::new();
        let ticket = table.begin(GroupKey::Snooze).unwrap();
        assert_eq!(table.status(GroupKey::Snooze), SaveStatus::Loading);

        let err = table.begin(GroupKey::Snooze).unwrap_err();
        assert_eq!(err, SyncError::ConcurrentSaveRejected { group: GroupKey::Snooze });
        // Other groups are independent
        assert!(table.begin(GroupKey::Dnd).is_ok());

        assert_eq!(table.settle(ticket, true).unwrap(), SaveStatus::Success);
    }

    #[test]
    fn failure_goes_straight_to_idle() {
        let mut table = StatusTable::new();
        let ticket = table.begin(GroupKey::Dnd).unwrap();
        assert_eq!(table.settle(ticket, false).unwrap(), SaveStatus::Idle);
        assert_eq!(table.expire_success(ticket), Ok(false));
    }

    #[test]
    fn expire_ignores_newer_save() {
        let mut table = StatusTable::new();
        let first = table.begin(GroupKey::Notifications).unwrap();
        table.settle(first, true).unwrap();

        // A new save starts while the success is still displayed
        let second = table.begin(GroupKey::Notifications).unwrap();
        assert_eq!(table.expire_success(first), Ok(false));
        assert_eq!(table.status(GroupKey::Notifications), SaveStatus::Loading);

        table.settle(second, true).unwrap();
        assert_eq!(table.expire_success(second), Ok(true));
        assert_eq!(table.status(GroupKey::Notifications), SaveStatus::Idle);
    }

    #[test]
    fn stale_ticket_cannot_settle() {
        let mut table = StatusTable::new();
        let first = table.begin(GroupKey::Dnd).unwrap();
        table.settle(first, false).unwrap();
        let _second = table.begin(GroupKey::Dnd).unwrap();
        assert_eq!(table.settle(first, true), Err(TransitionError::StaleTicket(GroupKey::Dnd)));
    }

    #[test]
    fn group_key_round_trips_through_str() {
        for group in GroupKey::ALL {
            assert_eq!(group.as_str().parse::<GroupKey>().unwrap(), group);
        }
        assert!("volume".parse::<GroupKey>().is_err());
    }

    fn any_status() -> impl Strategy<Value = SaveStatus> {
        prop_oneof![
            Just(SaveStatus::Idle),
            Just(SaveStatus::Loading),
            Just(SaveStatus::Success),
        ]
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Begin(usize),
        Settle(usize, bool),
        Expire(usize),
    }

    fn any_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3).prop_map(Op::Begin),
            (0usize..16, any::<bool>()).prop_map(|(pick, ok)| Op::Settle(pick, ok)),
            (0usize..16).prop_map(Op::Expire),
        ]
    }

    proptest! {
        #[test]
        fn prop_loading_is_never_self_reachable(from in any_status()) {
            prop_assert!(!is_allowed(from, from));
        }

        #[test]
        fn prop_interleaved_operations_follow_the_lifecycle(
            ops in proptest::collection::vec(any_op(), 1..60)
        ) {
            let mut table = StatusTable::new();
            let mut issued: Vec<SaveTicket> = Vec::new();
            let mut latest: BTreeMap<GroupKey, u64> = BTreeMap::new();

            for op in ops {
                let before = table.snapshot();
                match op {
                    Op::Begin(idx) => {
                        let group = GroupKey::ALL[idx];
                        let was = table.status(group);
                        match table.begin(group) {
                            Ok(ticket) => {
                                prop_assert_ne!(was, SaveStatus::Loading);
                                latest.insert(group, ticket.generation());
                                issued.push(ticket);
                            }
                            Err(_) => prop_assert_eq!(was, SaveStatus::Loading),
                        }
                    }
                    Op::Settle(pick, succeeded) => {
                        if issued.is_empty() {
                            continue;
                        }
                        let ticket = issued[pick % issued.len()];
                        let result = table.settle(ticket, succeeded);
                        if latest.get(&ticket.group()) != Some(&ticket.generation()) {
                            prop_assert_eq!(result, Err(TransitionError::StaleTicket(ticket.group())));
                        }
                    }
                    Op::Expire(pick) => {
                        if issued.is_empty() {
                            continue;
                        }
                        let ticket = issued[pick % issued.len()];
                        let was = table.status(ticket.group());
                        let expired = table.expire_success(ticket).unwrap();
                        let current = latest.get(&ticket.group()) == Some(&ticket.generation());
                        prop_assert_eq!(expired, current && was == SaveStatus::Success);
                    }
                }

                for ((group, from), (_, to)) in before.iter().zip(table.snapshot()) {
                    if *from == to {
                        continue;
                    }
                    prop_assert!(is_allowed(*from, to), "{group}: {from} -> {to}");
                    match to {
                        SaveStatus::Loading => prop_assert!(matches!(op, Op::Begin(_))),
                        SaveStatus::Success => prop_assert!(matches!(op, Op::Settle(_, true))),
                        SaveStatus::Idle => prop_assert!(!matches!(op, Op::Begin(_))),
                    }
                }
            }
        }
    }
}
