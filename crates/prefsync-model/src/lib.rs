//! Prefsync Model - preference records and save bookkeeping
//!
//! Pure building blocks shared by every prefsync crate:
//! - The persisted [`PreferenceRecord`] and its quiet-hours window
//! - Partial mutations and full-record payload construction
//! - Session-local draft, persisted copy and notifications baseline
//! - Per-group save status table with its lifecycle
//! - The append-only diagnostic log
//! - The [`SyncError`] taxonomy
//!
//! Nothing in this crate performs I/O.
//!
//! # Example
//!
//! ```rust
//! use prefsync_model::prelude::*;
//!
//! let user = UserId::new("user-1").unwrap();
//! let record = PreferenceRecord::new(user, true, DndWindow::disabled(), None);
//! let mut state = LocalPreferences::from_record(record);
//!
//! state.toggle_notifications();
//! assert!(state.notifications_dirty());
//!
//! let payload = build_payload(state.draft(), &PreferencePatch::notifications(false));
//! assert!(!payload.notifications_enabled());
//! ```

#![warn(missing_docs)]

pub mod diagnostics;
pub mod error;
pub mod instant;
pub mod patch;
pub mod record;
pub mod state;
pub mod status;
pub mod time;

// Re-exports for convenience
pub use diagnostics::{preview_body, DiagnosticEntry, DiagnosticKind, DiagnosticLog};
pub use error::{SyncError, SyncResult};
pub use instant::{format_instant, parse_instant};
pub use patch::{build_payload, compute_snooze_until, PreferenceDraft, PreferencePatch};
pub use record::{format_snoozed_until, EmptyUserId, PreferenceRecord, Suppression, UserId};
pub use state::LocalPreferences;
pub use status::{
    allowed_transitions, is_allowed, GroupKey, SaveStatus, SaveTicket, StatusTable,
    TransitionError,
};
pub use time::{DndWindow, TimeOfDay, TimeOfDayError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with prefsync models
    pub use crate::{
        build_payload, compute_snooze_until, DiagnosticKind, DiagnosticLog, DndWindow, GroupKey,
        LocalPreferences, PreferenceDraft, PreferencePatch, PreferenceRecord, SaveStatus,
        StatusTable, SyncError, SyncResult, TimeOfDay, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
