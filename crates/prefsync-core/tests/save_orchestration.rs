//! Save orchestration through a settings session

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use prefsync_core::{SettingsSession, StatusEvent, SyncConfig};
use prefsync_model::{
    DiagnosticKind, DiagnosticLog, DndWindow, GroupKey, PreferenceDraft, PreferenceRecord,
    SaveStatus, SyncError, UserId,
};
use prefsync_store::{PreferencesStore, StaticConfigSource};
use prefsync_test_utils::{record, time, FakeHost, ScriptedStore, TEST_USER};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn rejected() -> SyncError {
    SyncError::SaveRejected {
        marker: "Please try again later".to_string(),
    }
}

async fn open_with<S>(store: S, log: Arc<DiagnosticLog>) -> SettingsSession<S>
where
    S: PreferencesStore + 'static,
{
    let config = SyncConfig::new().with_baked_api_base(None);
    let source = StaticConfigSource::new(Some("https://api.test".to_string()));
    let host = FakeHost::with_context_user(TEST_USER);
    SettingsSession::open(&config, &source, &host, log, move |_, _| store)
        .await
        .unwrap()
}

async fn open(store: ScriptedStore) -> SettingsSession<ScriptedStore> {
    open_with(store, Arc::new(DiagnosticLog::new())).await
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<StatusEvent>) -> Vec<SaveStatus> {
    let mut seen = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => seen.push(event.status),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return seen,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
}

/// Store that writes a response marker into the session log after every save
struct LoggingStore {
    inner: ScriptedStore,
    log: Arc<DiagnosticLog>,
}

#[async_trait]
impl PreferencesStore for LoggingStore {
    async fn load(&self, user_id: &UserId) -> Result<PreferenceRecord, SyncError> {
        self.inner.load(user_id).await
    }

    async fn save(&self, record: &PreferenceRecord) -> Result<(), SyncError> {
        let result = self.inner.save(record).await;
        let status = if result.is_ok() { "200 OK" } else { "200 OK (rejected)" };
        self.log.record(DiagnosticKind::ResponseStatus, status);
        result
    }
}

#[tokio::test(start_paused = true)]
async fn second_save_of_same_group_is_ignored() {
    let session = open(ScriptedStore::loaded(record()).with_save_latency(Duration::from_secs(1))).await;

    let (first, second) = tokio::join!(session.save_dnd(), session.save_dnd());
    assert_eq!(first, Ok(()));
    assert_eq!(
        second,
        Err(SyncError::ConcurrentSaveRejected { group: GroupKey::Dnd })
    );
    assert!(!second.unwrap_err().is_user_facing());
    assert_eq!(session.store().save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn different_groups_save_independently() {
    let session = open(ScriptedStore::loaded(record()).with_save_latency(Duration::from_secs(1))).await;
    session.snooze_for(1);

    let (dnd, snooze) = tokio::join!(session.save_dnd(), session.save_snooze());
    assert_eq!(dnd, Ok(()));
    assert_eq!(snooze, Ok(()));
    assert_eq!(session.store().save_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn baseline_moves_only_on_notifications_save() {
    let session = open(ScriptedStore::loaded(record())).await;
    assert!(!session.can_save_notifications());

    session.toggle_notifications();
    assert!(session.can_save_notifications());

    // Saving another group carries the draft value but keeps the gate open
    session.save_dnd().await.unwrap();
    assert!(!session.persisted().notifications_enabled());
    assert!(session.can_save_notifications());

    session.save_notifications().await.unwrap();
    assert!(!session.can_save_notifications());
    assert_eq!(
        session.store().last_saved().map(|r| r.notifications_enabled()),
        Some(false)
    );
}

#[tokio::test(start_paused = true)]
async fn loaded_record_saves_back_unchanged() {
    let stored = PreferenceRecord::new(
        UserId::new(TEST_USER).unwrap(),
        false,
        DndWindow::new(time("22:00"), time("06:00")),
        None,
    );
    let session = open(ScriptedStore::loaded(stored.clone())).await;
    assert_eq!(session.draft(), PreferenceDraft::from(&stored));

    session.save_dnd().await.unwrap();
    assert_eq!(session.store().last_saved(), Some(stored));
}

#[tokio::test(start_paused = true)]
async fn disabled_quiet_hours_save_as_sentinel_and_keep_selection() {
    let session = open(ScriptedStore::loaded(record())).await;
    session.set_dnd_window(time("21:00"), time("07:00"));
    session.set_dnd_enabled(false);

    session.save_dnd().await.unwrap();
    let saved = session.store().last_saved().unwrap();
    assert!(!saved.dnd_enabled());
    assert_eq!(saved.dnd_start().to_string(), "00:00");
    assert_eq!(saved.dnd_end().to_string(), "00:00");

    session.set_dnd_enabled(true);
    assert_eq!(session.draft().dnd, DndWindow::new(time("21:00"), time("07:00")));
}

#[tokio::test(start_paused = true)]
async fn rejected_save_is_retried_once_after_cooldown() {
    let log = Arc::new(DiagnosticLog::new());
    let store = LoggingStore {
        inner: ScriptedStore::loaded(record()).then_save(Err(rejected())),
        log: Arc::clone(&log),
    };
    let session = open_with(store, Arc::clone(&log)).await;

    session.save_snooze().await.unwrap();

    let saves = session.store().inner.saves();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[0].record, saves[1].record);
    assert!(saves[1].at - saves[0].at >= Duration::from_secs(120));

    let retry = log.position(DiagnosticKind::Retry).unwrap();
    let responses = log.positions(DiagnosticKind::ResponseStatus);
    assert_eq!(responses.len(), 2);
    assert!(responses[0] < retry && retry < responses[1]);
    assert_eq!(session.status(GroupKey::Snooze), SaveStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn second_rejection_surfaces_as_failure() {
    let session = open(
        ScriptedStore::loaded(record())
            .then_save(Err(rejected()))
            .then_save(Err(rejected())),
    )
    .await;
    session.toggle_notifications();

    let err = session.save_notifications().await.unwrap_err();
    assert_eq!(err, rejected());
    assert_eq!(session.store().save_count(), 2);
    assert_eq!(session.status(GroupKey::Notifications), SaveStatus::Idle);
    // The local toggle stays in place
    assert!(!session.draft().notifications_enabled);
    assert!(session.can_save_notifications());
}

#[tokio::test(start_paused = true)]
async fn server_error_is_not_retried() {
    let session =
        open(ScriptedStore::loaded(record()).then_save(Err(SyncError::SaveFailed { status: 500 }))).await;
    let mut rx = session.subscribe();

    let err = session.save_dnd().await.unwrap_err();
    assert_eq!(err, SyncError::SaveFailed { status: 500 });
    assert_eq!(session.store().save_count(), 1);
    assert_eq!(session.status(GroupKey::Dnd), SaveStatus::Idle);
    assert_eq!(drain(&mut rx), vec![SaveStatus::Loading, SaveStatus::Idle]);
    assert_eq!(session.log().position(DiagnosticKind::Retry), None);
    assert!(session.log().find("[Error] Update failed").is_some());
}

#[tokio::test(start_paused = true)]
async fn snooze_save_flashes_success_then_idles() {
    let session = open(ScriptedStore::loaded(record())).await;
    let mut rx = session.subscribe();

    let until = session.snooze_for(4);
    session.save_snooze().await.unwrap();
    assert_eq!(session.status(GroupKey::Snooze), SaveStatus::Success);
    assert_eq!(session.persisted().snoozed_until(), Some(until));

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(session.status(GroupKey::Snooze), SaveStatus::Idle);
    assert_eq!(
        drain(&mut rx),
        vec![SaveStatus::Loading, SaveStatus::Success, SaveStatus::Idle]
    );
    assert!(session.log().find("[UI] SnoozedUntilUtc set to").is_some());
}

#[tokio::test(start_paused = true)]
async fn success_revert_never_clobbers_newer_save() {
    let session = open(ScriptedStore::loaded(record()).with_save_latency(Duration::from_secs(1))).await;

    session.save_dnd().await.unwrap();
    // The display window of the first save ends while the second is in flight
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let second = session.save_dnd();
    let probe = async {
        tokio::time::sleep(Duration::from_millis(700)).await;
        session.status(GroupKey::Dnd)
    };
    let (result, during) = tokio::join!(second, probe);
    assert_eq!(result, Ok(()));
    assert_eq!(during, SaveStatus::Loading);
}

#[tokio::test(start_paused = true)]
async fn closing_during_cooldown_drops_the_result() {
    let session = open(ScriptedStore::loaded(record()).then_save(Err(rejected()))).await;

    let save = session.save_dnd();
    let closer = async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        session.close();
    };
    let (result, ()) = tokio::join!(save, closer);

    assert_eq!(result, Err(SyncError::SessionClosed));
    assert_eq!(session.store().save_count(), 1);
    assert_eq!(session.status(GroupKey::Dnd), SaveStatus::Idle);
    assert!(session.is_closed());
    assert_eq!(session.save_dnd().await, Err(SyncError::SessionClosed));
}

#[tokio::test(start_paused = true)]
async fn cancelled_save_does_not_wedge_its_group() {
    let session = open(ScriptedStore::loaded(record()).with_save_latency(Duration::from_secs(5))).await;
    let mut rx = session.subscribe();

    let timed_out = tokio::time::timeout(Duration::from_secs(1), session.save_dnd()).await;
    assert!(timed_out.is_err());
    assert_eq!(session.status(GroupKey::Dnd), SaveStatus::Idle);
    assert_eq!(drain(&mut rx), vec![SaveStatus::Loading, SaveStatus::Idle]);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(session.status(GroupKey::Dnd), SaveStatus::Idle);
    assert_eq!(session.save_dnd().await, Ok(()));
    assert_eq!(session.store().save_count(), 2);
}
