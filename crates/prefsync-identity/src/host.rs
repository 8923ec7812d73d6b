//! Host environment port
//!
//! The embedding host (a chat client tab, a desktop shell, the CLI) owns
//! the user's identity. The resolver only needs three capabilities from it.

use async_trait::async_trait;
use prefsync_model::UserId;
use serde::{Deserialize, Serialize};

/// Failure reported by the host
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    /// Wrap a host failure message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Identity hints exposed by the host context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostContext {
    /// `user.id`
    #[serde(default)]
    pub user_id: Option<String>,
    /// `user.aadObjectId`
    #[serde(default)]
    pub aad_object_id: Option<String>,
    /// Legacy top-level `userObjectId`
    #[serde(default)]
    pub user_object_id: Option<String>,
}

impl HostContext {
    /// Context exposing only `user.id`
    #[must_use]
    pub fn with_user_id(id: impl Into<String>) -> Self {
        Self {
            user_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// First non-empty subject, in host precedence order
    #[must_use]
    pub fn subject(&self) -> Option<UserId> {
        [&self.user_id, &self.aad_object_id, &self.user_object_id]
            .into_iter()
            .flatten()
            .find_map(|raw| UserId::new(raw.as_str()))
    }
}

/// Capabilities the identity resolver needs from its host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Initialise the host SDK
    async fn initialize(&self) -> Result<(), HostError>;

    /// Read the host context
    async fn context(&self) -> Result<HostContext, HostError>;

    /// Request an identity token for the current user
    async fn request_token(&self) -> Result<String, HostError>;
}
