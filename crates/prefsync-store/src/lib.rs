//! Prefsync Store - remote persistence of notification preferences
//!
//! - [`PreferencesStore`]: the load/save port used by the save orchestrator
//! - [`HttpPreferencesStore`]: the port over the `/api/user/settings` endpoint
//! - [`RejectionPolicy`]: body-level backpressure detection
//! - [`resolve_api_base`]: runtime-then-baked base URL resolution
//!
//! # Example
//!
//! ```rust,ignore
//! use prefsync_store::{resolve_api_base, HttpPreferencesStore, StaticConfigSource, BAKED_API_BASE};
//!
//! # async fn example(log: std::sync::Arc<prefsync_model::DiagnosticLog>) -> Result<(), prefsync_model::SyncError> {
//! let source = StaticConfigSource::new(Some("https://api.example.com".into()));
//! let resolved = resolve_api_base(&source, BAKED_API_BASE, &log).await?;
//! let store = HttpPreferencesStore::new(resolved.base, log);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod rejection;
pub mod wire;

pub use client::{HttpPreferencesStore, PreferencesStore, DEFAULT_PREVIEW_LIMIT};
pub use config::{
    resolve_api_base, ApiBase, ConfigOrigin, ConfigSourceError, FileConfigSource,
    HttpConfigSource, ResolvedBase, RuntimeConfig, RuntimeConfigSource, StaticConfigSource,
    BAKED_API_BASE, SETTINGS_PATH,
};
pub use rejection::{RejectionPolicy, DEFAULT_MARKER};
pub use wire::{LoadDefaults, SettingsDocument, SettingsUpdate};
