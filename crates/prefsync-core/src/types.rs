//! Session-level types

use prefsync_model::{GroupKey, SaveStatus, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Unique identifier of a settings session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate a new session id
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A group's save status changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Group whose status changed
    pub group: GroupKey,
    /// New status
    pub status: SaveStatus,
}

/// How the session's preferences were seeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// The stored record was loaded
    Loaded,
    /// Loading failed; UI defaults are shown
    Defaults {
        /// Why the load failed
        reason: SyncError,
    },
}

impl LoadState {
    /// Check if the stored record was loaded
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded)
    }
}
