//! Session configuration

use prefsync_identity::{IdentityResolver, DEFAULT_SUBJECT_CLAIM};
use prefsync_model::{DndWindow, TimeOfDay};
use prefsync_store::{LoadDefaults, RejectionPolicy, BAKED_API_BASE, DEFAULT_MARKER, DEFAULT_PREVIEW_LIMIT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of a settings session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bound on the host token request, in milliseconds
    pub token_timeout_ms: u64,
    /// Wait before the single retry of a rejected save, in seconds
    pub retry_cooldown_secs: u64,
    /// How long a successful save stays displayed, in milliseconds
    pub success_display_ms: u64,
    /// Quiet-hours start used when nothing was loaded
    pub default_dnd_start: TimeOfDay,
    /// Quiet-hours end used when nothing was loaded
    pub default_dnd_end: TimeOfDay,
    /// Global switch used when nothing was loaded
    pub default_notifications_enabled: bool,
    /// Token claim carrying the user id
    pub subject_claim: String,
    /// Body phrases marking a save as rejected
    pub rejection_markers: Vec<String>,
    /// Body characters kept in the diagnostic log
    pub preview_limit: usize,
    /// Fallback API base URL when the runtime document has none
    pub baked_api_base: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            token_timeout_ms: 8_000,
            retry_cooldown_secs: 120,
            success_display_ms: 1_500,
            default_dnd_start: TimeOfDay::from_hour(9),
            default_dnd_end: TimeOfDay::from_hour(18),
            default_notifications_enabled: true,
            subject_claim: DEFAULT_SUBJECT_CLAIM.to_string(),
            rejection_markers: vec![DEFAULT_MARKER.to_string()],
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            baked_api_base: BAKED_API_BASE.map(str::to_string),
        }
    }
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With identity token timeout
    #[must_use]
    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.token_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With retry cooldown
    #[must_use]
    pub fn with_retry_cooldown(mut self, cooldown: Duration) -> Self {
        self.retry_cooldown_secs = cooldown.as_secs();
        self
    }

    /// With success display window
    #[must_use]
    pub fn with_success_display(mut self, display: Duration) -> Self {
        self.success_display_ms = u64::try_from(display.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With default quiet hours
    #[inline]
    #[must_use]
    pub fn with_default_dnd(mut self, start: TimeOfDay, end: TimeOfDay) -> Self {
        self.default_dnd_start = start;
        self.default_dnd_end = end;
        self
    }

    /// With token subject claim
    #[inline]
    #[must_use]
    pub fn with_subject_claim(mut self, claim: impl Into<String>) -> Self {
        self.subject_claim = claim.into();
        self
    }

    /// With rejection markers
    #[must_use]
    pub fn with_rejection_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rejection_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// With log preview limit
    #[inline]
    #[must_use]
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// With build-time fallback base URL
    #[inline]
    #[must_use]
    pub fn with_baked_api_base(mut self, base: Option<String>) -> Self {
        self.baked_api_base = base;
        self
    }

    /// Identity token timeout
    #[inline]
    #[must_use]
    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.token_timeout_ms)
    }

    /// Retry cooldown
    #[inline]
    #[must_use]
    pub fn retry_cooldown(&self) -> Duration {
        Duration::from_secs(self.retry_cooldown_secs)
    }

    /// Success display window
    #[inline]
    #[must_use]
    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }

    /// Quiet hours shown when nothing was loaded
    #[must_use]
    pub fn default_dnd(&self) -> DndWindow {
        DndWindow::new(self.default_dnd_start, self.default_dnd_end)
    }

    /// Values filling gaps in a loaded document
    #[must_use]
    pub fn load_defaults(&self) -> LoadDefaults {
        LoadDefaults {
            dnd_start: self.default_dnd_start,
            dnd_end: self.default_dnd_end,
            notifications_enabled: self.default_notifications_enabled,
        }
    }

    /// Rejection policy built from the configured markers
    #[must_use]
    pub fn rejection_policy(&self) -> RejectionPolicy {
        RejectionPolicy::markers(self.rejection_markers.iter().cloned())
    }

    /// Identity resolver honouring the timeout and subject claim
    #[must_use]
    pub fn identity_resolver(&self) -> IdentityResolver {
        IdentityResolver::new()
            .with_token_timeout(self.token_timeout())
            .with_subject_claim(self.subject_claim.clone())
    }
}
