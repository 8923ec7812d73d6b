//! Testing utilities for the prefsync workspace
//!
//! Scripted store and host doubles plus record fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use prefsync_identity::{HostContext, HostEnvironment, HostError};
use prefsync_model::{DndWindow, PreferenceRecord, SyncError, TimeOfDay, UserId};
use prefsync_store::PreferencesStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

pub const TEST_USER: &str = "00000000-0000-4000-8000-000000000001";

pub fn user_id() -> UserId {
    UserId::new(TEST_USER).unwrap()
}

pub fn time(raw: &str) -> TimeOfDay {
    raw.parse().unwrap()
}

/// Record with notifications on and quiet hours 09:00-18:00
pub fn record() -> PreferenceRecord {
    PreferenceRecord::new(
        user_id(),
        true,
        DndWindow::new(time("09:00"), time("18:00")),
        None,
    )
}

/// Unsigned token whose payload is `claims`
pub fn jwt_with_claims(claims: &serde_json::Value) -> String {
    format!(
        "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{}.",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// A save the store received, with the (tokio) instant it arrived
#[derive(Debug, Clone)]
pub struct SaveCall {
    pub record: PreferenceRecord,
    pub at: Instant,
}

/// In-memory store answering from a script
///
/// Saves pop results from a queue and succeed once it is empty.
#[derive(Debug)]
pub struct ScriptedStore {
    load_result: Mutex<Result<PreferenceRecord, SyncError>>,
    save_results: Mutex<VecDeque<Result<(), SyncError>>>,
    save_latency: Option<Duration>,
    loads: Mutex<Vec<UserId>>,
    saves: Mutex<Vec<SaveCall>>,
}

impl ScriptedStore {
    pub fn new(load_result: Result<PreferenceRecord, SyncError>) -> Self {
        Self {
            load_result: Mutex::new(load_result),
            save_results: Mutex::new(VecDeque::new()),
            save_latency: None,
            loads: Mutex::new(Vec::new()),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn loaded(record: PreferenceRecord) -> Self {
        Self::new(Ok(record))
    }

    pub fn failing_load(err: SyncError) -> Self {
        Self::new(Err(err))
    }

    /// Queue the result of the next unscripted save
    pub fn then_save(self, result: Result<(), SyncError>) -> Self {
        self.save_results.lock().push_back(result);
        self
    }

    /// Delay every save by `latency`
    pub fn with_save_latency(mut self, latency: Duration) -> Self {
        self.save_latency = Some(latency);
        self
    }

    pub fn push_save_result(&self, result: Result<(), SyncError>) {
        self.save_results.lock().push_back(result);
    }

    pub fn loads(&self) -> Vec<UserId> {
        self.loads.lock().clone()
    }

    pub fn saves(&self) -> Vec<SaveCall> {
        self.saves.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }

    pub fn last_saved(&self) -> Option<PreferenceRecord> {
        self.saves.lock().last().map(|call| call.record.clone())
    }
}

#[async_trait]
impl PreferencesStore for ScriptedStore {
    async fn load(&self, user_id: &UserId) -> Result<PreferenceRecord, SyncError> {
        self.loads.lock().push(user_id.clone());
        self.load_result.lock().clone()
    }

    async fn save(&self, record: &PreferenceRecord) -> Result<(), SyncError> {
        self.saves.lock().push(SaveCall {
            record: record.clone(),
            at: Instant::now(),
        });
        if let Some(latency) = self.save_latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.save_results.lock().pop_front();
        next.unwrap_or(Ok(()))
    }
}

/// How [`FakeHost`] answers token requests
#[derive(Debug, Clone)]
pub enum TokenBehavior {
    Token(String),
    Fail(String),
    Hang,
}

/// Host double with call counters
#[derive(Debug)]
pub struct FakeHost {
    init_error: Option<String>,
    context: Result<HostContext, String>,
    token: TokenBehavior,
    init_calls: AtomicUsize,
    token_calls: AtomicUsize,
}

impl FakeHost {
    /// Host whose context exposes `user_id`
    pub fn with_context_user(user_id: &str) -> Self {
        Self {
            init_error: None,
            context: Ok(HostContext::with_user_id(user_id)),
            token: TokenBehavior::Fail("token not expected".to_string()),
            init_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
        }
    }

    /// Host with an empty context answering token requests with `token`
    pub fn with_token(token: TokenBehavior) -> Self {
        Self {
            init_error: None,
            context: Ok(HostContext::default()),
            token,
            init_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
        }
    }

    /// Host whose SDK fails to initialise
    pub fn failing_init(message: &str) -> Self {
        Self {
            init_error: Some(message.to_string()),
            ..Self::with_token(TokenBehavior::Hang)
        }
    }

    pub fn with_context_error(mut self, message: &str) -> Self {
        self.context = Err(message.to_string());
        self
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostEnvironment for FakeHost {
    async fn initialize(&self) -> Result<(), HostError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        match &self.init_error {
            Some(message) => Err(HostError::new(message.clone())),
            None => Ok(()),
        }
    }

    async fn context(&self) -> Result<HostContext, HostError> {
        self.context.clone().map_err(HostError::new)
    }

    async fn request_token(&self) -> Result<String, HostError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        match &self.token {
            TokenBehavior::Token(token) => Ok(token.clone()),
            TokenBehavior::Fail(message) => Err(HostError::new(message.clone())),
            TokenBehavior::Hang => std::future::pending().await,
        }
    }
}
