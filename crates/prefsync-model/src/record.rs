//! The persisted preference record
//!
//! A [`PreferenceRecord`] is always internally consistent: its quiet-hours
//! boundaries read as the sentinel whenever quiet hours are disabled.

use crate::time::{DndWindow, TimeOfDay};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attempted to build a [`UserId`] from an empty string
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("user id must not be empty")]
pub struct EmptyUserId;

/// Opaque, stable, non-empty user identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a user id; blank input yields `None`
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == raw.len() {
            Some(Self(raw))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = EmptyUserId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(EmptyUserId)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why alerts would be held back at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// An unexpired snooze is set
    Snoozed,
    /// The global notification switch is off
    NotificationsDisabled,
    /// The local time falls inside quiet hours
    QuietHours,
}

/// The persisted unit of preferences for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRecord {
    user_id: UserId,
    notifications_enabled: bool,
    dnd: DndWindow,
    snoozed_until: Option<DateTime<Utc>>,
}

impl PreferenceRecord {
    /// Create a record, normalising quiet-hours boundaries
    #[must_use]
    pub fn new(
        user_id: UserId,
        notifications_enabled: bool,
        dnd: DndWindow,
        snoozed_until: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            notifications_enabled,
            dnd: dnd.normalized(),
            snoozed_until,
        }
    }

    /// Owner of the record
    #[inline]
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Global alert switch
    #[inline]
    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// Quiet-hours window (normalised)
    #[inline]
    #[must_use]
    pub fn dnd(&self) -> DndWindow {
        self.dnd
    }

    /// Whether quiet hours are active
    #[inline]
    #[must_use]
    pub fn dnd_enabled(&self) -> bool {
        self.dnd.enabled
    }

    /// Quiet-hours start (sentinel when disabled)
    #[inline]
    #[must_use]
    pub fn dnd_start(&self) -> TimeOfDay {
        self.dnd.start
    }

    /// Quiet-hours end (sentinel when disabled)
    #[inline]
    #[must_use]
    pub fn dnd_end(&self) -> TimeOfDay {
        self.dnd.end
    }

    /// Absolute snooze deadline, possibly already elapsed
    #[inline]
    #[must_use]
    pub fn snoozed_until(&self) -> Option<DateTime<Utc>> {
        self.snoozed_until
    }

    /// Check if a snooze is still running at `now`
    ///
    /// Elapsed snoozes stay in the record for display but are inactive.
    #[must_use]
    pub fn is_snoozed_at(&self, now: DateTime<Utc>) -> bool {
        self.snoozed_until.is_some_and(|until| until > now)
    }

    /// Evaluate whether alerts are suppressed
    ///
    /// `local_time` is the user's wall-clock time, used for quiet hours.
    #[must_use]
    pub fn suppression_at(&self, now: DateTime<Utc>, local_time: TimeOfDay) -> Option<Suppression> {
        if self.is_snoozed_at(now) {
            Some(Suppression::Snoozed)
        } else if !self.notifications_enabled {
            Some(Suppression::NotificationsDisabled)
        } else if self.dnd.contains(local_time) {
            Some(Suppression::QuietHours)
        } else {
            None
        }
    }
}

/// Render a snooze deadline the way the settings view shows it
///
/// Example: `19 Oct 2026, 03:04 pm`.
#[must_use]
pub fn format_snoozed_until(until: DateTime<Utc>) -> String {
    until.format("%d %b %Y, %I:%M %P").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn uid() -> UserId {
        UserId::new("00000000-aaaa-bbbb-cccc-000000000001").unwrap()
    }

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn user_id_rejects_blank_and_trims() {
        assert!(UserId::new("").is_none());
        assert!(UserId::new("   ").is_none());
        assert_eq!(UserId::new(" abc ").unwrap().as_str(), "abc");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[test]
    fn record_normalises_disabled_window() {
        let mut window = DndWindow::new(t("22:00"), t("06:00"));
        window.enabled = false;
        let record = PreferenceRecord::new(uid(), true, window, None);
        assert!(!record.dnd_enabled());
        assert_eq!(record.dnd_start(), TimeOfDay::SENTINEL);
        assert_eq!(record.dnd_end(), TimeOfDay::SENTINEL);
    }

    #[test]
    fn elapsed_snooze_is_inactive() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let past = PreferenceRecord::new(
            uid(),
            true,
            DndWindow::disabled(),
            Some(now - chrono::Duration::hours(1)),
        );
        assert!(!past.is_snoozed_at(now));
        assert!(past.snoozed_until().is_some());

        let future = PreferenceRecord::new(
            uid(),
            true,
            DndWindow::disabled(),
            Some(now + chrono::Duration::minutes(5)),
        );
        assert!(future.is_snoozed_at(now));
    }

    #[test]
    fn suppression_prefers_snooze_then_switch_then_quiet_hours() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let window = DndWindow::new(t("09:00"), t("18:00"));

        let snoozed = PreferenceRecord::new(uid(), false, window, Some(now + chrono::Duration::hours(1)));
        assert_eq!(snoozed.suppression_at(now, t("10:00")), Some(Suppression::Snoozed));

        let muted = PreferenceRecord::new(uid(), false, window, None);
        assert_eq!(muted.suppression_at(now, t("20:00")), Some(Suppression::NotificationsDisabled));

        let quiet = PreferenceRecord::new(uid(), true, window, None);
        assert_eq!(quiet.suppression_at(now, t("10:00")), Some(Suppression::QuietHours));
        assert_eq!(quiet.suppression_at(now, t("20:00")), None);
    }

    #[test]
    fn snooze_display_format() {
        let until = Utc.with_ymd_and_hms(2026, 10, 19, 15, 4, 0).unwrap();
        assert_eq!(format_snoozed_until(until), "19 Oct 2026, 03:04 pm");
    }
}
