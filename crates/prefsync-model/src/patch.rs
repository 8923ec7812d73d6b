//! Partial mutations and payload construction
//!
//! The remote store only accepts whole records, so every save merges a
//! [`PreferencePatch`] over the current draft via [`build_payload`]. Both
//! are pure and free of I/O.

use crate::record::{PreferenceRecord, UserId};
use crate::status::GroupKey;
use crate::time::DndWindow;
use chrono::{DateTime, Duration, Utc};

/// Working copy of the preferences as edited in the UI
///
/// Unlike [`PreferenceRecord`], a draft keeps the quiet-hours selector
/// values while quiet hours are disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceDraft {
    /// Owner of the preferences
    pub user_id: UserId,
    /// Global alert switch
    pub notifications_enabled: bool,
    /// Quiet-hours toggle and selector values
    pub dnd: DndWindow,
    /// Snooze deadline
    pub snoozed_until: Option<DateTime<Utc>>,
}

impl From<&PreferenceRecord> for PreferenceDraft {
    fn from(record: &PreferenceRecord) -> Self {
        Self {
            user_id: record.user_id().clone(),
            notifications_enabled: record.notifications_enabled(),
            dnd: record.dnd(),
            snoozed_until: record.snoozed_until(),
        }
    }
}

/// Fields a save overrides; unset fields come from the current draft
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencePatch {
    /// New global switch value
    pub notifications_enabled: Option<bool>,
    /// New quiet-hours window
    pub dnd: Option<DndWindow>,
    /// New snooze deadline (`Some(None)` clears it)
    pub snoozed_until: Option<Option<DateTime<Utc>>>,
}

impl PreferencePatch {
    /// Patch for the notifications group
    #[inline]
    #[must_use]
    pub fn notifications(enabled: bool) -> Self {
        Self {
            notifications_enabled: Some(enabled),
            ..Self::default()
        }
    }

    /// Patch for the quiet-hours group
    #[inline]
    #[must_use]
    pub fn dnd(window: DndWindow) -> Self {
        Self {
            dnd: Some(window),
            ..Self::default()
        }
    }

    /// Patch for the snooze group
    #[inline]
    #[must_use]
    pub fn snooze(until: Option<DateTime<Utc>>) -> Self {
        Self {
            snoozed_until: Some(until),
            ..Self::default()
        }
    }

    /// Check if the patch overrides nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifications_enabled.is_none() && self.dnd.is_none() && self.snoozed_until.is_none()
    }

    /// Check if the patch touches fields owned by `group`
    #[must_use]
    pub fn touches(&self, group: GroupKey) -> bool {
        match group {
            GroupKey::Notifications => self.notifications_enabled.is_some(),
            GroupKey::Dnd => self.dnd.is_some(),
            GroupKey::Snooze => self.snoozed_until.is_some(),
        }
    }
}

/// Merge `patch` over `current` into the full record sent to the store
///
/// Quiet-hours boundaries are forced to the sentinel when the resulting
/// window is disabled.
#[must_use]
pub fn build_payload(current: &PreferenceDraft, patch: &PreferencePatch) -> PreferenceRecord {
    PreferenceRecord::new(
        current.user_id.clone(),
        patch
            .notifications_enabled
            .unwrap_or(current.notifications_enabled),
        patch.dnd.unwrap_or(current.dnd),
        patch.snoozed_until.unwrap_or(current.snoozed_until),
    )
}

/// Snooze deadline `hours` after `now`
///
/// Saturates at the largest representable instant instead of overflowing.
#[must_use]
pub fn compute_snooze_until(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
