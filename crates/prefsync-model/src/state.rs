//! Session-owned local preference state
//!
//! Tracks three views of the same preferences:
//! - the draft being edited
//! - the last record known to be persisted remotely
//! - the notifications baseline gating the notifications save action

use crate::patch::PreferenceDraft;
use crate::record::{PreferenceRecord, UserId};
use crate::status::GroupKey;
use crate::time::{DndWindow, TimeOfDay};
use chrono::{DateTime, Utc};

/// Local preference state for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPreferences {
    draft: PreferenceDraft,
    persisted: PreferenceRecord,
    baseline_notifications: bool,
}

impl LocalPreferences {
    /// State seeded from a record loaded from the store
    #[must_use]
    pub fn from_record(record: PreferenceRecord) -> Self {
        Self {
            draft: PreferenceDraft::from(&record),
            baseline_notifications: record.notifications_enabled(),
            persisted: record,
        }
    }

    /// State seeded with UI defaults when nothing could be loaded
    #[must_use]
    pub fn with_defaults(user_id: UserId, notifications_enabled: bool, dnd: DndWindow) -> Self {
        let draft = PreferenceDraft {
            user_id: user_id.clone(),
            notifications_enabled,
            dnd,
            snoozed_until: None,
        };
        Self {
            draft,
            persisted: PreferenceRecord::new(user_id, notifications_enabled, dnd, None),
            baseline_notifications: notifications_enabled,
        }
    }

    /// Current working copy
    #[inline]
    #[must_use]
    pub fn draft(&self) -> &PreferenceDraft {
        &self.draft
    }

    /// Last record known to be persisted
    #[inline]
    #[must_use]
    pub fn persisted(&self) -> &PreferenceRecord {
        &self.persisted
    }

    /// Notifications value at the last successful notifications save
    #[inline]
    #[must_use]
    pub fn baseline_notifications(&self) -> bool {
        self.baseline_notifications
    }

    /// Check if the notifications draft differs from the baseline
    #[inline]
    #[must_use]
    pub fn notifications_dirty(&self) -> bool {
        self.draft.notifications_enabled != self.baseline_notifications
    }

    /// Set the global switch in the draft
    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.draft.notifications_enabled = enabled;
    }

    /// Flip the global switch in the draft, returning the new value
    pub fn toggle_notifications(&mut self) -> bool {
        self.draft.notifications_enabled = !self.draft.notifications_enabled;
        self.draft.notifications_enabled
    }

    /// Enable or disable quiet hours, keeping the selector values
    pub fn set_dnd_enabled(&mut self, enabled: bool) {
        self.draft.dnd.enabled = enabled;
    }

    /// Change the quiet-hours selector values
    pub fn set_dnd_window(&mut self, start: TimeOfDay, end: TimeOfDay) {
        self.draft.dnd.start = start;
        self.draft.dnd.end = end;
    }

    /// Set or clear the snooze deadline in the draft
    pub fn set_snoozed_until(&mut self, until: Option<DateTime<Utc>>) {
        self.draft.snoozed_until = until;
    }

    /// Record a successful save of `group`
    ///
    /// The persisted record becomes `saved`; the baseline only moves for
    /// the notifications group. The draft is left alone.
    pub fn apply_saved(&mut self, group: GroupKey, saved: &PreferenceRecord) {
        self.persisted = saved.clone();
        if group == GroupKey::Notifications {
            self.baseline_notifications = saved.notifications_enabled();
        }
    }
}
