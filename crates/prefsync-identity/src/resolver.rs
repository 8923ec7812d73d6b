//! Identity resolution
//!
//! Resolution order:
//! 1. Initialise the host; failure is terminal
//! 2. Take the subject from the host context when present
//! 3. Otherwise request a token, bounded by a timeout, and read the
//!    subject claim from it
//!
//! The token request is the only bounded wait in the engine.

use crate::host::HostEnvironment;
use crate::token::{decode_claims, subject_claim};
use prefsync_model::{DiagnosticKind, DiagnosticLog, SyncError, UserId};
use std::time::Duration;
use tracing::{info, warn};

/// Default bound on the host token request
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(8);

/// Default claim carrying the user's object id
pub const DEFAULT_SUBJECT_CLAIM: &str = "oid";

/// Resolved identity of the current user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id used as the record key
    pub user_id: UserId,
    /// Bearer token, when the subject came from one
    pub token: Option<String>,
}

/// Resolves the current user through a [`HostEnvironment`]
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    token_timeout: Duration,
    subject_claim: String,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self {
            token_timeout: DEFAULT_TOKEN_TIMEOUT,
            subject_claim: DEFAULT_SUBJECT_CLAIM.to_string(),
        }
    }
}

impl IdentityResolver {
    /// Resolver with the default timeout and subject claim
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the token request
    #[must_use]
    pub fn with_token_timeout(mut self, timeout: Duration) -> Self {
        self.token_timeout = timeout;
        self
    }

    /// Read the subject from claim `name`
    #[must_use]
    pub fn with_subject_claim(mut self, name: impl Into<String>) -> Self {
        self.subject_claim = name.into();
        self
    }

    /// Configured token timeout
    #[inline]
    #[must_use]
    pub fn token_timeout(&self) -> Duration {
        self.token_timeout
    }

    /// Resolve the current user
    ///
    /// # Errors
    /// - `SyncError::HostUnavailable` if the host cannot initialise or
    ///   refuses a token
    /// - `SyncError::IdentityTimeout` if no token arrives in time
    /// - `SyncError::MissingSubject` if the token has no subject claim
    pub async fn resolve<H>(&self, host: &H, log: &DiagnosticLog) -> Result<Identity, SyncError>
    where
        H: HostEnvironment + ?Sized,
    {
        if let Err(e) = host.initialize().await {
            log.record(DiagnosticKind::Error, format!("Host initialize failed: {e}"));
            warn!(error = %e, "host initialisation failed");
            return Err(SyncError::HostUnavailable(e.to_string()));
        }
        log.record(
            DiagnosticKind::Identity,
            "Host initialized. Reading app context...",
        );

        match host.context().await {
            Ok(ctx) => {
                if let Some(user_id) = ctx.subject() {
                    log.record(
                        DiagnosticKind::Identity,
                        format!("Context subject detected: {user_id}"),
                    );
                    info!(user = %user_id, "identity resolved from host context");
                    return Ok(Identity {
                        user_id,
                        token: None,
                    });
                }
            }
            Err(e) => {
                log.record(DiagnosticKind::Identity, format!("getContext failed: {e}"));
            }
        }

        log.record(
            DiagnosticKind::Identity,
            "Context subject not available; requesting auth token...",
        );
        let timeout_ms = u64::try_from(self.token_timeout.as_millis()).unwrap_or(u64::MAX);
        let token = match tokio::time::timeout(self.token_timeout, host.request_token()).await {
            Err(_) => {
                log.record(
                    DiagnosticKind::Error,
                    format!("Token request timed out after {timeout_ms}ms"),
                );
                warn!(timeout_ms, "identity token request timed out");
                return Err(SyncError::IdentityTimeout { timeout_ms });
            }
            Ok(Err(e)) => {
                log.record(DiagnosticKind::Error, format!("Token request failed: {e}"));
                warn!(error = %e, "identity token request failed");
                return Err(SyncError::HostUnavailable(e.to_string()));
            }
            Ok(Ok(token)) => token,
        };

        let claims = decode_claims(&token);
        match subject_claim(&claims, &self.subject_claim) {
            Some(user_id) => {
                log.record(
                    DiagnosticKind::Identity,
                    format!("Token received. ObjectId={user_id}"),
                );
                info!(user = %user_id, "identity resolved from token");
                Ok(Identity {
                    user_id,
                    token: Some(token),
                })
            }
            None => {
                log.record(
                    DiagnosticKind::Error,
                    format!(
                        "Claim '{}' missing in token; cannot load settings.",
                        self.subject_claim
                    ),
                );
                warn!(claim = %self.subject_claim, "identity token has no subject");
                Err(SyncError::MissingSubject)
            }
        }
    }
}
