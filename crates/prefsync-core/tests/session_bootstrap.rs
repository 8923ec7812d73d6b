//! Opening settings sessions

use prefsync_core::{LoadState, SettingsSession, SyncConfig};
use prefsync_model::{DiagnosticKind, DiagnosticLog, GroupKey, SaveStatus, SyncError};
use prefsync_store::StaticConfigSource;
use prefsync_test_utils::{jwt_with_claims, record, time, FakeHost, ScriptedStore, TokenBehavior, TEST_USER};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn config() -> SyncConfig {
    SyncConfig::new().with_baked_api_base(None)
}

fn runtime_source() -> StaticConfigSource {
    StaticConfigSource::new(Some("https://api.test/".to_string()))
}

#[tokio::test(start_paused = true)]
async fn context_identity_loads_record() {
    let log = Arc::new(DiagnosticLog::new());
    let host = FakeHost::with_context_user(TEST_USER);
    let session = SettingsSession::open(&config(), &runtime_source(), &host, Arc::clone(&log), |base, identity| {
        assert_eq!(base.as_str(), "https://api.test");
        assert_eq!(identity.token, None);
        ScriptedStore::loaded(record())
    })
    .await
    .unwrap();

    assert_eq!(session.load_state(), &LoadState::Loaded);
    assert_eq!(session.user_id().as_str(), TEST_USER);
    assert_eq!(session.store().loads(), vec![session.user_id().clone()]);
    assert_eq!(host.token_calls(), 0);
    for group in GroupKey::ALL {
        assert_eq!(session.status(group), SaveStatus::Idle);
    }

    let config_at = log.position(DiagnosticKind::Config).unwrap();
    let init_at = log.position(DiagnosticKind::Init).unwrap();
    assert!(config_at < init_at);
}

#[tokio::test(start_paused = true)]
async fn token_identity_carries_bearer() {
    let token = jwt_with_claims(&json!({ "oid": "from-token" }));
    let host = FakeHost::with_token(TokenBehavior::Token(token.clone()));
    let session = SettingsSession::open(
        &config(),
        &runtime_source(),
        &host,
        Arc::new(DiagnosticLog::new()),
        |_, identity| {
            assert_eq!(identity.token.as_deref(), Some(token.as_str()));
            ScriptedStore::failing_load(SyncError::LoadFailed { status: 404 })
        },
    )
    .await
    .unwrap();
    assert_eq!(session.user_id().as_str(), "from-token");
    assert_eq!(host.token_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_load_falls_back_to_defaults() {
    let log = Arc::new(DiagnosticLog::new());
    let host = FakeHost::with_context_user(TEST_USER);
    let session = SettingsSession::open(&config(), &runtime_source(), &host, Arc::clone(&log), |_, _| {
        ScriptedStore::failing_load(SyncError::NetworkError("connection reset".to_string()))
    })
    .await
    .unwrap();

    assert_eq!(
        session.load_state(),
        &LoadState::Defaults {
            reason: SyncError::NetworkError("connection reset".to_string())
        }
    );
    let draft = session.draft();
    assert!(draft.notifications_enabled);
    assert!(draft.dnd.enabled);
    assert_eq!(draft.dnd.start, time("09:00"));
    assert_eq!(draft.dnd.end, time("18:00"));
    assert_eq!(draft.snoozed_until, None);
    assert!(log.find("[Error] Failed to load settings").is_some());

    // Saving still works from defaults
    session.save_dnd().await.unwrap();
    assert_eq!(session.store().save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn identity_timeout_never_reaches_the_store() {
    let host = FakeHost::with_token(TokenBehavior::Hang);
    let connected = AtomicBool::new(false);
    let started = tokio::time::Instant::now();

    let result = SettingsSession::open(
        &config(),
        &runtime_source(),
        &host,
        Arc::new(DiagnosticLog::new()),
        |_, _| {
            connected.store(true, Ordering::SeqCst);
            ScriptedStore::loaded(record())
        },
    )
    .await;

    assert_eq!(result.unwrap_err(), SyncError::IdentityTimeout { timeout_ms: 8000 });
    assert!(started.elapsed() >= Duration::from_secs(8));
    assert!(!connected.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn token_without_subject_is_terminal() {
    let host = FakeHost::with_token(TokenBehavior::Token(jwt_with_claims(&json!({ "sub": "x" }))));
    let result = SettingsSession::open(
        &config(),
        &runtime_source(),
        &host,
        Arc::new(DiagnosticLog::new()),
        |_, _| ScriptedStore::loaded(record()),
    )
    .await;
    let err = result.unwrap_err();
    assert_eq!(err, SyncError::MissingSubject);
    assert!(err.is_terminal());
}

#[tokio::test(start_paused = true)]
async fn missing_config_skips_identity_and_load() {
    let log = Arc::new(DiagnosticLog::new());
    let host = FakeHost::with_context_user(TEST_USER);
    let result = SettingsSession::open(
        &config(),
        &StaticConfigSource::new(None),
        &host,
        Arc::clone(&log),
        |_, _| ScriptedStore::loaded(record()),
    )
    .await;

    assert_eq!(result.unwrap_err(), SyncError::ConfigMissing);
    assert_eq!(host.init_calls(), 0);
    assert_eq!(log.len(), 1);
    assert_eq!(log.position(DiagnosticKind::ConfigError), Some(0));
}

#[tokio::test(start_paused = true)]
async fn baked_base_is_used_without_runtime_value() {
    let host = FakeHost::with_context_user(TEST_USER);
    let session = SettingsSession::open(
        &config().with_baked_api_base(Some("https://baked.test//".to_string())),
        &StaticConfigSource::new(None),
        &host,
        Arc::new(DiagnosticLog::new()),
        |_, _| ScriptedStore::loaded(record()),
    )
    .await
    .unwrap();
    assert_eq!(session.api_base().as_str(), "https://baked.test");
}

#[tokio::test(start_paused = true)]
async fn host_init_failure_is_host_unavailable() {
    let host = FakeHost::failing_init("sdk not loaded");
    let result = SettingsSession::open(
        &config(),
        &runtime_source(),
        &host,
        Arc::new(DiagnosticLog::new()),
        |_, _| ScriptedStore::loaded(record()),
    )
    .await;
    assert_eq!(
        result.unwrap_err(),
        SyncError::HostUnavailable("sdk not loaded".to_string())
    );
    assert_eq!(host.token_calls(), 0);
}
