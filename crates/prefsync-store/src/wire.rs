//! JSON documents exchanged with the preferences endpoint

use chrono::{DateTime, Utc};
use prefsync_model::{DndWindow, PreferenceRecord, SyncError, TimeOfDay, UserId};
use serde::{Deserialize, Serialize};

/// Values substituted for fields the remote leaves out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadDefaults {
    /// Quiet-hours start when `dndStart` is missing or empty
    pub dnd_start: TimeOfDay,
    /// Quiet-hours end when `dndEnd` is missing or empty
    pub dnd_end: TimeOfDay,
    /// Global switch when `notificationsEnabled` is missing
    pub notifications_enabled: bool,
}

impl Default for LoadDefaults {
    fn default() -> Self {
        Self {
            dnd_start: TimeOfDay::from_hour(9),
            dnd_end: TimeOfDay::from_hour(18),
            notifications_enabled: true,
        }
    }
}

/// Body of a successful `GET /api/user/settings`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    /// Global switch
    #[serde(default)]
    pub notifications_enabled: Option<bool>,
    /// Snooze deadline
    #[serde(default, with = "prefsync_model::instant::option")]
    pub snoozed_until_utc: Option<DateTime<Utc>>,
    /// Quiet-hours start, `HH:MM`
    #[serde(default)]
    pub dnd_start: Option<String>,
    /// Quiet-hours end, `HH:MM`
    #[serde(default)]
    pub dnd_end: Option<String>,
}

impl SettingsDocument {
    /// Convert into a record owned by `user_id`
    ///
    /// Missing or empty boundaries fall back to `defaults`; `00:00`/`00:00`
    /// reads as quiet hours disabled.
    ///
    /// # Errors
    /// - `SyncError::MalformedResponse` if a boundary is not a valid time
    pub fn into_record(
        self,
        user_id: UserId,
        defaults: &LoadDefaults,
    ) -> Result<PreferenceRecord, SyncError> {
        let start = boundary(self.dnd_start.as_deref(), defaults.dnd_start, "dndStart")?;
        let end = boundary(self.dnd_end.as_deref(), defaults.dnd_end, "dndEnd")?;
        Ok(PreferenceRecord::new(
            user_id,
            self.notifications_enabled
                .unwrap_or(defaults.notifications_enabled),
            DndWindow::from_boundaries(start, end),
            self.snoozed_until_utc,
        ))
    }
}

fn boundary(raw: Option<&str>, default: TimeOfDay, field: &str) -> Result<TimeOfDay, SyncError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| SyncError::MalformedResponse(format!("{field} {value:?}: {e}"))),
    }
}

/// Body of `POST /api/user/settings`
///
/// The endpoint replaces the whole record, so every field is always sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    /// Owner of the record
    pub object_id: UserId,
    /// Global switch
    pub notifications_enabled: bool,
    /// Snooze deadline, `null` when unset
    #[serde(with = "prefsync_model::instant::option")]
    pub snoozed_until_utc: Option<DateTime<Utc>>,
    /// Quiet-hours start (sentinel when disabled)
    pub dnd_start: TimeOfDay,
    /// Quiet-hours end (sentinel when disabled)
    pub dnd_end: TimeOfDay,
}

impl From<&PreferenceRecord> for SettingsUpdate {
    fn from(record: &PreferenceRecord) -> Self {
        let (dnd_start, dnd_end) = record.dnd().boundaries();
        Self {
            object_id: record.user_id().clone(),
            notifications_enabled: record.notifications_enabled(),
            snoozed_until_utc: record.snoozed_until(),
            dnd_start,
            dnd_end,
        }
    }
}
