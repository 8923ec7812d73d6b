//! Preferences store client
//!
//! [`PreferencesStore`] is the port the save orchestrator talks to.
//! [`HttpPreferencesStore`] implements it against the remote
//! `/api/user/settings` endpoint:
//! - `GET ?objectId=` returns the stored record
//! - `POST` replaces the whole record
//!
//! A 2xx save whose body carries a rejection marker is still a failure.
//! Every request and response is recorded in the diagnostic log.

use crate::config::ApiBase;
use crate::rejection::RejectionPolicy;
use crate::wire::{LoadDefaults, SettingsDocument, SettingsUpdate};
use async_trait::async_trait;
use prefsync_model::{preview_body, DiagnosticKind, DiagnosticLog, PreferenceRecord, SyncError, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of body characters kept in the diagnostic log
pub const DEFAULT_PREVIEW_LIMIT: usize = 1200;

/// Remote persistence of preference records
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Fetch the stored record of `user_id`
    ///
    /// # Errors
    /// - `SyncError::LoadFailed` on a non-2xx status
    /// - `SyncError::NetworkError` on transport failure
    /// - `SyncError::MalformedResponse` if the body does not decode
    async fn load(&self, user_id: &UserId) -> Result<PreferenceRecord, SyncError>;

    /// Replace the stored record with `record`
    ///
    /// # Errors
    /// - `SyncError::SaveRejected` if the body carries a rejection marker
    /// - `SyncError::SaveFailed` on a non-2xx status
    /// - `SyncError::NetworkError` on transport failure
    async fn save(&self, record: &PreferenceRecord) -> Result<(), SyncError>;
}

#[async_trait]
impl<T: PreferencesStore + ?Sized> PreferencesStore for Arc<T> {
    async fn load(&self, user_id: &UserId) -> Result<PreferenceRecord, SyncError> {
        (**self).load(user_id).await
    }

    async fn save(&self, record: &PreferenceRecord) -> Result<(), SyncError> {
        (**self).save(record).await
    }
}

fn network(err: reqwest::Error) -> SyncError {
    SyncError::NetworkError(err.to_string())
}

/// [`PreferencesStore`] backed by the remote HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpPreferencesStore {
    client: reqwest::Client,
    base: ApiBase,
    bearer: Option<String>,
    rejection: RejectionPolicy,
    defaults: LoadDefaults,
    preview_limit: usize,
    log: Arc<DiagnosticLog>,
}

impl HttpPreferencesStore {
    /// Client for the endpoint under `base`, logging into `log`
    #[must_use]
    pub fn new(base: ApiBase, log: Arc<DiagnosticLog>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            bearer: None,
            rejection: RejectionPolicy::default(),
            defaults: LoadDefaults::default(),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            log,
        }
    }

    /// Attach `Authorization: Bearer <token>` to every request
    #[must_use]
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token.filter(|t| !t.is_empty());
        self
    }

    /// Replace the rejection marker policy
    #[must_use]
    pub fn with_rejection(mut self, policy: RejectionPolicy) -> Self {
        self.rejection = policy;
        self
    }

    /// Replace the values used for fields missing from a loaded document
    #[must_use]
    pub fn with_defaults(mut self, defaults: LoadDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set how many body characters are kept in the diagnostic log
    #[must_use]
    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies)
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Endpoint base this client talks to
    #[inline]
    #[must_use]
    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl PreferencesStore for HttpPreferencesStore {
    async fn load(&self, user_id: &UserId) -> Result<PreferenceRecord, SyncError> {
        let request = self
            .authorize(
                self.client
                    .get(self.base.settings_url())
                    .query(&[("objectId", user_id.as_str())]),
            )
            .build()
            .map_err(network)?;
        self.log.record(DiagnosticKind::Load, request.url().as_str());
        debug!(url = %request.url(), "loading preferences");

        let response = self.client.execute(request).await.map_err(network)?;
        let status = response.status();
        let body = response.text().await.map_err(network)?;
        self.log.record(DiagnosticKind::Load, format!("status={status}"));
        self.log.record(
            DiagnosticKind::Load,
            format!("bodyPreview:\n{}", preview_body(&body, self.preview_limit)),
        );

        if !status.is_success() {
            warn!(%status, "preferences load failed");
            return Err(SyncError::LoadFailed {
                status: status.as_u16(),
            });
        }

        let document: SettingsDocument = serde_json::from_str(&body)
            .map_err(|e| SyncError::MalformedResponse(e.to_string()))?;
        let record = document.into_record(user_id.clone(), &self.defaults)?;
        info!(user = %user_id, "preferences loaded");
        Ok(record)
    }

    async fn save(&self, record: &PreferenceRecord) -> Result<(), SyncError> {
        let body = SettingsUpdate::from(record);
        let pretty = serde_json::to_string_pretty(&body)
            .map_err(|e| SyncError::MalformedResponse(e.to_string()))?;
        self.log.record(DiagnosticKind::Request, pretty);

        let response = self
            .authorize(self.client.post(self.base.settings_url()).json(&body))
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        let text = response.text().await.map_err(network)?;
        self.log
            .record(DiagnosticKind::ResponseStatus, status.to_string());
        self.log.record(
            DiagnosticKind::ResponseBody,
            format!("\n{}", preview_body(&text, self.preview_limit)),
        );

        if let Some(marker) = self.rejection.detect(&text) {
            warn!(%status, %marker, "save rejected by remote");
            return Err(SyncError::SaveRejected { marker });
        }
        if !status.is_success() {
            warn!(%status, "save failed");
            return Err(SyncError::SaveFailed {
                status: status.as_u16(),
            });
        }

        info!(user = %record.user_id(), "preferences saved");
        Ok(())
    }
}
