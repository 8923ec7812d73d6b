//! Prefsync Core - notification preference sessions
//!
//! Ties the workspace together:
//! - Resolves the API base URL and the current user
//! - Loads the stored preferences, falling back to UI defaults
//! - Saves each preference group independently with bounded retry
//! - Publishes per-group save status changes
//!
//! # Example
//!
//! ```rust,ignore
//! use prefsync_core::{SettingsSession, SyncConfig};
//! use prefsync_store::StaticConfigSource;
//!
//! # async fn example(host: &impl prefsync_identity::HostEnvironment) -> Result<(), prefsync_model::SyncError> {
//! let config = SyncConfig::new();
//! let source = StaticConfigSource::new(Some("https://api.example.com".into()));
//! let log = std::sync::Arc::new(prefsync_model::DiagnosticLog::new());
//!
//! let session = SettingsSession::open_http(&config, &source, host, log).await?;
//! session.toggle_notifications();
//! if session.can_save_notifications() {
//!     session.save_notifications().await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod orchestrator;
pub mod session;
pub mod types;

pub use config::SyncConfig;
pub use orchestrator::{SaveOrchestrator, STATUS_CHANNEL_CAPACITY};
pub use session::SettingsSession;
pub use types::{LoadState, SessionId, StatusEvent};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a settings session
    pub use crate::{LoadState, SettingsSession, StatusEvent, SyncConfig};
    pub use prefsync_model::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
