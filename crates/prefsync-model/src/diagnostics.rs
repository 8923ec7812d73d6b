//! Append-only diagnostic log
//!
//! Every significant engine event (config resolution, request issued,
//! response received, retry triggered, failure) appends one entry. Entries
//! are numbered in append order, which is the causal order of the events.
//! The log is purely observational and never drives control flow.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a diagnostic entry, rendered as its bracketed marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// API base URL resolution
    Config,
    /// API base URL resolution failed
    ConfigError,
    /// Identity resolution
    Identity,
    /// Initial load request and response
    Load,
    /// Outgoing save body
    Request,
    /// Save response status line
    ResponseStatus,
    /// Save response body preview
    ResponseBody,
    /// Save retry scheduled
    Retry,
    /// Session bootstrap
    Init,
    /// User-driven state change
    Ui,
    /// Failure surfaced to the caller
    Error,
}

impl DiagnosticKind {
    /// Bracketed marker prefixed to rendered lines
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            DiagnosticKind::Config => "[Config]",
            DiagnosticKind::ConfigError => "[Config][Error]",
            DiagnosticKind::Identity => "[Identity]",
            DiagnosticKind::Load => "[GET]",
            DiagnosticKind::Request => "[Request]",
            DiagnosticKind::ResponseStatus => "[Response Status]",
            DiagnosticKind::ResponseBody => "[Response Body]",
            DiagnosticKind::Retry => "[Retry]",
            DiagnosticKind::Init => "[Init]",
            DiagnosticKind::Ui => "[UI]",
            DiagnosticKind::Error => "[Error]",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One timestamped log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    /// Zero-based append position
    pub sequence: u64,
    /// Wall-clock time of the append
    pub timestamp: DateTime<Utc>,
    /// Event category
    pub kind: DiagnosticKind,
    /// Free-form detail following the marker
    pub message: String,
}

impl DiagnosticEntry {
    /// Render as `<marker> <message>`
    ///
    /// Multi-line messages starting with a newline are attached directly
    /// to the marker.
    #[must_use]
    pub fn line(&self) -> String {
        let sep = if self.message.starts_with('\n') { "" } else { " " };
        format!("{}{sep}{}", self.kind.tag(), self.message)
    }
}

impl fmt::Display for DiagnosticEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}

/// Thread-safe append-only diagnostic log shared by one session
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    inner: Mutex<Vec<DiagnosticEntry>>,
}

impl DiagnosticLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its sequence number
    pub fn record(&self, kind: DiagnosticKind, message: impl Into<String>) -> u64 {
        let message = message.into();
        let mut guard = self.inner.lock();
        let sequence = guard.len() as u64;
        tracing::debug!(sequence, marker = kind.tag(), "{message}");
        guard.push(DiagnosticEntry {
            sequence,
            timestamp: Utc::now(),
            kind,
            message,
        });
        sequence
    }

    /// Snapshot of every entry in append order
    #[must_use]
    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.inner.lock().clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if nothing has been logged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Render the whole log, one entry per line
    #[must_use]
    pub fn render(&self) -> String {
        self.inner
            .lock()
            .iter()
            .map(DiagnosticEntry::line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sequence number of the first entry of `kind`
    #[must_use]
    pub fn position(&self, kind: DiagnosticKind) -> Option<u64> {
        self.inner
            .lock()
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.sequence)
    }

    /// Sequence numbers of every entry of `kind`
    #[must_use]
    pub fn positions(&self, kind: DiagnosticKind) -> Vec<u64> {
        self.inner
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.sequence)
            .collect()
    }

    /// First entry whose rendered line contains `needle`
    #[must_use]
    pub fn find(&self, needle: &str) -> Option<DiagnosticEntry> {
        self.inner
            .lock()
            .iter()
            .find(|e| e.line().contains(needle))
            .cloned()
    }
}

/// Preview a response body for the log
///
/// Empty bodies render as `<empty>`; bodies longer than `limit` characters
/// are cut and suffixed with `...<truncated>`.
#[must_use]
pub fn preview_body(body: &str, limit: usize) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...<truncated>", &body[..cut]),
        None => body.to_string(),
    }
}
