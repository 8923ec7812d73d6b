//! Settings session bootstrap and lifecycle
//!
//! Opening a session resolves the API base URL, then the user, then loads
//! the stored record. Config and identity failures are terminal and happen
//! before any remote call; a failed load falls back to UI defaults.

use crate::config::SyncConfig;
use crate::orchestrator::SaveOrchestrator;
use crate::types::{LoadState, SessionId, StatusEvent};
use chrono::{DateTime, Utc};
use prefsync_identity::{HostEnvironment, Identity};
use prefsync_model::{
    compute_snooze_until, format_instant, DiagnosticKind, DiagnosticLog, DndWindow, GroupKey,
    LocalPreferences, PreferenceDraft, PreferencePatch, PreferenceRecord, SaveStatus, SyncError,
    TimeOfDay, UserId,
};
use prefsync_store::{
    resolve_api_base, ApiBase, HttpPreferencesStore, PreferencesStore, RuntimeConfigSource,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn, Instrument};

/// One user's settings view: identity, local state and save orchestration
#[derive(Debug)]
pub struct SettingsSession<S> {
    id: SessionId,
    identity: Identity,
    base: ApiBase,
    load_state: LoadState,
    orchestrator: Arc<SaveOrchestrator<S>>,
}

impl<S> SettingsSession<S>
where
    S: PreferencesStore + 'static,
{
    /// Open a session
    ///
    /// `connect` builds the store once the base URL and identity are known.
    ///
    /// # Errors
    /// - `SyncError::ConfigMissing` if no API base URL is configured
    /// - `SyncError::IdentityTimeout`, `SyncError::MissingSubject` or
    ///   `SyncError::HostUnavailable` if the user cannot be resolved
    pub async fn open<H, F>(
        config: &SyncConfig,
        source: &dyn RuntimeConfigSource,
        host: &H,
        log: Arc<DiagnosticLog>,
        connect: F,
    ) -> Result<Self, SyncError>
    where
        H: HostEnvironment + ?Sized,
        F: FnOnce(&ApiBase, &Identity) -> S,
    {
        let id = SessionId::new();
        let span = tracing::info_span!("session", id = %id);
        Self::bootstrap(id, config, source, host, log, connect)
            .instrument(span)
            .await
    }

    async fn bootstrap<H, F>(
        id: SessionId,
        config: &SyncConfig,
        source: &dyn RuntimeConfigSource,
        host: &H,
        log: Arc<DiagnosticLog>,
        connect: F,
    ) -> Result<Self, SyncError>
    where
        H: HostEnvironment + ?Sized,
        F: FnOnce(&ApiBase, &Identity) -> S,
    {
        let resolved = resolve_api_base(source, config.baked_api_base.as_deref(), &log).await?;
        let identity = config.identity_resolver().resolve(host, &log).await?;
        let store = connect(&resolved.base, &identity);

        let (state, load_state) = match store.load(&identity.user_id).await {
            Ok(record) => {
                log.record(DiagnosticKind::Init, "Settings loaded successfully");
                (LocalPreferences::from_record(record), LoadState::Loaded)
            }
            Err(reason) => {
                log.record(
                    DiagnosticKind::Error,
                    format!("Failed to load settings: {reason}"),
                );
                warn!(error = %reason, "load failed, showing defaults");
                let state = LocalPreferences::with_defaults(
                    identity.user_id.clone(),
                    config.default_notifications_enabled,
                    config.default_dnd(),
                );
                (state, LoadState::Defaults { reason })
            }
        };
        info!(user = %identity.user_id, loaded = load_state.is_loaded(), "session opened");

        Ok(Self {
            id,
            identity,
            base: resolved.base,
            load_state,
            orchestrator: Arc::new(SaveOrchestrator::new(store, state, log, config)),
        })
    }

    /// Session id
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Resolved identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Record key of the current user
    #[inline]
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }

    /// Resolved API base URL
    #[inline]
    #[must_use]
    pub fn api_base(&self) -> &ApiBase {
        &self.base
    }

    /// How the preferences were seeded
    #[inline]
    #[must_use]
    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// Underlying store
    #[must_use]
    pub fn store(&self) -> &S {
        self.orchestrator.store()
    }

    /// Save orchestrator backing this session
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<SaveOrchestrator<S>> {
        &self.orchestrator
    }

    /// Diagnostic log of this session
    #[must_use]
    pub fn log(&self) -> &Arc<DiagnosticLog> {
        self.orchestrator.log()
    }

    /// Current working copy
    #[must_use]
    pub fn draft(&self) -> PreferenceDraft {
        self.orchestrator.with_state(|s| s.draft().clone())
    }

    /// Last record known to be persisted
    #[must_use]
    pub fn persisted(&self) -> PreferenceRecord {
        self.orchestrator.with_state(|s| s.persisted().clone())
    }

    /// Current status of `group`
    #[must_use]
    pub fn status(&self, group: GroupKey) -> SaveStatus {
        self.orchestrator.status(group)
    }

    /// Receive every status change from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.orchestrator.subscribe()
    }

    /// Set the global switch
    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.orchestrator
            .update_state(|s| s.set_notifications_enabled(enabled));
    }

    /// Flip the global switch, returning the new value
    pub fn toggle_notifications(&self) -> bool {
        self.orchestrator.update_state(LocalPreferences::toggle_notifications)
    }

    /// Enable or disable quiet hours
    pub fn set_dnd_enabled(&self, enabled: bool) {
        self.orchestrator.update_state(|s| s.set_dnd_enabled(enabled));
    }

    /// Change the quiet-hours window
    pub fn set_dnd_window(&self, start: TimeOfDay, end: TimeOfDay) {
        self.orchestrator.update_state(|s| s.set_dnd_window(start, end));
    }

    /// Snooze for `hours` from now, returning the deadline
    pub fn snooze_for(&self, hours: u32) -> DateTime<Utc> {
        self.snooze_from(Utc::now(), hours)
    }

    /// Snooze for `hours` from `now`, returning the deadline
    pub fn snooze_from(&self, now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
        let until = compute_snooze_until(now, hours);
        self.orchestrator
            .update_state(|s| s.set_snoozed_until(Some(until)));
        self.log().record(
            DiagnosticKind::Ui,
            format!("SnoozedUntilUtc set to {}", format_instant(until)),
        );
        until
    }

    /// Drop the snooze deadline
    pub fn clear_snooze(&self) {
        self.orchestrator.update_state(|s| s.set_snoozed_until(None));
        self.log().record(DiagnosticKind::Ui, "SnoozedUntilUtc cleared");
    }

    /// Check if the notifications save action is enabled
    ///
    /// The draft must differ from the last saved value and no
    /// notifications save may be in flight.
    #[must_use]
    pub fn can_save_notifications(&self) -> bool {
        self.orchestrator.with_state(LocalPreferences::notifications_dirty)
            && self.status(GroupKey::Notifications) != SaveStatus::Loading
    }

    /// Save the global switch
    ///
    /// # Errors
    /// See [`SaveOrchestrator::run_save`].
    pub async fn save_notifications(&self) -> Result<(), SyncError> {
        let enabled = self.orchestrator.with_state(|s| s.draft().notifications_enabled);
        self.orchestrator
            .run_save(GroupKey::Notifications, PreferencePatch::notifications(enabled))
            .await
    }

    /// Save the quiet-hours window
    ///
    /// # Errors
    /// See [`SaveOrchestrator::run_save`].
    pub async fn save_dnd(&self) -> Result<(), SyncError> {
        let window: DndWindow = self.orchestrator.with_state(|s| s.draft().dnd);
        self.orchestrator
            .run_save(GroupKey::Dnd, PreferencePatch::dnd(window))
            .await
    }

    /// Save the snooze deadline
    ///
    /// # Errors
    /// See [`SaveOrchestrator::run_save`].
    pub async fn save_snooze(&self) -> Result<(), SyncError> {
        let until = self.orchestrator.with_state(|s| s.draft().snoozed_until);
        self.orchestrator
            .run_save(GroupKey::Snooze, PreferencePatch::snooze(until))
            .await
    }

    /// Tear the session down; later results are not applied
    pub fn close(&self) {
        self.orchestrator.close();
    }

    /// Check if the session was torn down
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.orchestrator.is_alive()
    }
}

impl SettingsSession<HttpPreferencesStore> {
    /// Open a session against the HTTP preferences endpoint
    ///
    /// # Errors
    /// See [`SettingsSession::open`].
    pub async fn open_http<H>(
        config: &SyncConfig,
        source: &dyn RuntimeConfigSource,
        host: &H,
        log: Arc<DiagnosticLog>,
    ) -> Result<Self, SyncError>
    where
        H: HostEnvironment + ?Sized,
    {
        let store_log = Arc::clone(&log);
        Self::open(config, source, host, log, |base, identity| {
            HttpPreferencesStore::new(base.clone(), store_log)
                .with_bearer(identity.token.clone())
                .with_rejection(config.rejection_policy())
                .with_defaults(config.load_defaults())
                .with_preview_limit(config.preview_limit)
        })
        .await
    }
}
