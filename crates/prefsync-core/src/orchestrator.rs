//! Save orchestration
//!
//! Each save of a preference group runs through [`SaveOrchestrator::run_save`]:
//! 1. Refuse the save if the group is already `loading`
//! 2. Merge the group patch over the current draft into a full record
//! 3. Send it; a body-level rejection is retried once after a cooldown
//! 4. On success update the persisted state, flash `success`, revert to
//!    `idle` after the display window
//! 5. On failure go straight back to `idle`
//!
//! Local draft changes are never rolled back on failure. Locks are never
//! held across an await point. A save whose future is dropped mid-flight
//! settles its group back to `idle`.

use crate::config::SyncConfig;
use crate::types::StatusEvent;
use prefsync_model::{
    build_payload, DiagnosticKind, DiagnosticLog, GroupKey, LocalPreferences, PreferencePatch,
    PreferenceRecord, SaveStatus, SaveTicket, StatusTable, SyncError,
};
use prefsync_store::PreferencesStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the status event channel
pub const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Drives saves of preference groups against a store
#[derive(Debug)]
pub struct SaveOrchestrator<S> {
    store: S,
    state: Mutex<LocalPreferences>,
    statuses: Mutex<StatusTable>,
    events: broadcast::Sender<StatusEvent>,
    log: Arc<DiagnosticLog>,
    retry_cooldown: Duration,
    success_display: Duration,
    alive: AtomicBool,
}

impl<S> SaveOrchestrator<S>
where
    S: PreferencesStore + 'static,
{
    /// Orchestrator over `store`, seeded with `state`
    #[must_use]
    pub fn new(store: S, state: LocalPreferences, log: Arc<DiagnosticLog>, config: &SyncConfig) -> Self {
        let (events, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            store,
            state: Mutex::new(state),
            statuses: Mutex::new(StatusTable::new()),
            events,
            log,
            retry_cooldown: config.retry_cooldown(),
            success_display: config.success_display(),
            alive: AtomicBool::new(true),
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Diagnostic log shared with the store
    #[inline]
    #[must_use]
    pub fn log(&self) -> &Arc<DiagnosticLog> {
        &self.log
    }

    /// Receive every status change from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Current status of `group`
    #[must_use]
    pub fn status(&self, group: GroupKey) -> SaveStatus {
        self.statuses.lock().status(group)
    }

    /// Status of every group
    #[must_use]
    pub fn statuses(&self) -> Vec<(GroupKey, SaveStatus)> {
        self.statuses.lock().snapshot()
    }

    /// Read the local state
    pub fn with_state<R>(&self, read: impl FnOnce(&LocalPreferences) -> R) -> R {
        read(&self.state.lock())
    }

    /// Mutate the local state
    pub fn update_state<R>(&self, write: impl FnOnce(&mut LocalPreferences) -> R) -> R {
        write(&mut self.state.lock())
    }

    /// Check if results are still applied
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop applying results; in-flight saves resolve to `SessionClosed`
    pub fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            info!("save orchestrator closed");
        }
    }

    /// Save `group` by merging `patch` over the current draft
    ///
    /// # Errors
    /// - `SyncError::ConcurrentSaveRejected` if a save of `group` is in
    ///   flight; no request is sent
    /// - `SyncError::SessionClosed` if the session closed before the
    ///   result could be applied
    /// - Any store error once the retry budget is spent
    pub async fn run_save(self: &Arc<Self>, group: GroupKey, patch: PreferencePatch) -> Result<(), SyncError> {
        if !self.is_alive() {
            return Err(SyncError::SessionClosed);
        }

        let begun = self.statuses.lock().begin(group);
        let ticket = match begun {
            Ok(ticket) => ticket,
            Err(err) => {
                debug!(%group, "save ignored, already in flight");
                return Err(err);
            }
        };
        self.publish(group, SaveStatus::Loading);
        let pending = PendingSave::new(&self.statuses, &self.events, ticket);

        let payload = build_payload(self.state.lock().draft(), &patch);
        let outcome = match self.persist(&payload).await {
            Ok(()) if !self.is_alive() => Err(SyncError::SessionClosed),
            other => other,
        };

        match outcome {
            Ok(()) => {
                self.state.lock().apply_saved(group, &payload);
                pending.settle(true);
                info!(%group, "save succeeded");
                self.schedule_revert(ticket);
                Ok(())
            }
            Err(err) => {
                pending.settle(false);
                self.log
                    .record(DiagnosticKind::Error, format!("Update failed: {err}"));
                warn!(%group, error = %err, "save failed");
                Err(err)
            }
        }
    }

    async fn persist(&self, payload: &PreferenceRecord) -> Result<(), SyncError> {
        match self.store.save(payload).await {
            Err(err) if err.is_retryable() => {
                self.log.record(
                    DiagnosticKind::Retry,
                    format!(
                        "Waiting {}s and retrying update...",
                        self.retry_cooldown.as_secs()
                    ),
                );
                warn!(error = %err, cooldown = ?self.retry_cooldown, "save rejected, retrying once");
                tokio::time::sleep(self.retry_cooldown).await;
                if !self.is_alive() {
                    return Err(SyncError::SessionClosed);
                }
                self.store.save(payload).await
            }
            other => other,
        }
    }

    fn schedule_revert(self: &Arc<Self>, ticket: SaveTicket) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.success_display).await;
            let expired = this.statuses.lock().expire_success(ticket);
            match expired {
                Ok(true) => this.publish(ticket.group(), SaveStatus::Idle),
                Ok(false) => debug!(group = %ticket.group(), "success display superseded"),
                Err(e) => warn!(error = %e, "status table rejected revert"),
            }
        });
    }

    fn publish(&self, group: GroupKey, status: SaveStatus) {
        publish(&self.events, group, status);
    }
}

fn publish(events: &broadcast::Sender<StatusEvent>, group: GroupKey, status: SaveStatus) {
    debug!(%group, %status, "status changed");
    // No receivers is fine
    let _ = events.send(StatusEvent { group, status });
}

/// Status slot of an in-flight save
///
/// Dropping it unsettled (the save future was cancelled) returns the group
/// to `idle`.
struct PendingSave<'a> {
    statuses: &'a Mutex<StatusTable>,
    events: &'a broadcast::Sender<StatusEvent>,
    ticket: SaveTicket,
    settled: bool,
}

impl<'a> PendingSave<'a> {
    fn new(
        statuses: &'a Mutex<StatusTable>,
        events: &'a broadcast::Sender<StatusEvent>,
        ticket: SaveTicket,
    ) -> Self {
        Self {
            statuses,
            events,
            ticket,
            settled: false,
        }
    }

    fn settle(mut self, succeeded: bool) {
        self.finish(succeeded);
    }

    fn finish(&mut self, succeeded: bool) {
        self.settled = true;
        let settled = self.statuses.lock().settle(self.ticket, succeeded);
        match settled {
            Ok(status) => publish(self.events, self.ticket.group(), status),
            Err(e) => warn!(error = %e, "status table rejected settle"),
        }
    }
}

impl Drop for PendingSave<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(group = %self.ticket.group(), "save abandoned before completion");
            self.finish(false);
        }
    }
}
