//! Error types for preference synchronisation
//!
//! One taxonomy shared by every crate in the workspace:
//! - Identity resolution failures (timeout, missing subject, host failure)
//! - Configuration resolution failures
//! - Remote load/save failures, including soft rejections
//! - Local guards (concurrent saves, torn-down sessions)

use crate::status::GroupKey;

/// Result alias used across the workspace
pub type SyncResult<T> = Result<T, SyncError>;

/// Main synchronisation error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The host did not hand out a token within the allowed window
    #[error("identity resolution timed out after {timeout_ms}ms")]
    IdentityTimeout {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// A token was issued but carries no usable subject claim
    #[error("identity token carries no subject claim")]
    MissingSubject,

    /// The host environment failed to initialise or refused a token
    #[error("host environment unavailable: {0}")]
    HostUnavailable(String),

    /// Neither a runtime nor a build-time API base URL is available
    #[error("no API base URL configured (runtime or build-time)")]
    ConfigMissing,

    /// Initial load answered with a non-2xx status
    #[error("load failed with HTTP {status}")]
    LoadFailed {
        /// HTTP status code
        status: u16,
    },

    /// The remote embedded a rejection marker in its response body
    #[error("save rejected by remote: {marker}")]
    SaveRejected {
        /// Marker that triggered the rejection
        marker: String,
    },

    /// Save answered with a non-2xx status and no rejection marker
    #[error("save failed with HTTP {status}")]
    SaveFailed {
        /// HTTP status code
        status: u16,
    },

    /// Transport-level failure (DNS, connect, reset, body read)
    #[error("network error: {0}")]
    NetworkError(String),

    /// A 2xx response whose body could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A save for the same group is already in flight
    #[error("a {group} save is already in flight")]
    ConcurrentSaveRejected {
        /// Group whose save was ignored
        group: GroupKey,
    },

    /// The session was torn down before the result could be applied
    #[error("session closed before the result could be applied")]
    SessionClosed,
}

impl SyncError {
    /// Check if the orchestrator retries after this error
    ///
    /// Only the body-level rejection marker is retried; every other
    /// failure surfaces after a single attempt.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SaveRejected { .. })
    }

    /// Check if the error ends the session before any remote call
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing
                | Self::IdentityTimeout { .. }
                | Self::MissingSubject
                | Self::HostUnavailable(_)
        )
    }

    /// Check if the presentation layer should show this error
    #[inline]
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::ConcurrentSaveRejected { .. })
    }
}
