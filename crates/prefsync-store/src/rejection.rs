//! Body-level rejection detection
//!
//! The remote signals backpressure by embedding a marker phrase in an
//! otherwise ordinary response body. Detection is configurable so the
//! marker can change without touching the client.

use std::fmt;
use std::sync::Arc;

/// Marker phrase used by the preferences endpoint today
pub const DEFAULT_MARKER: &str = "Please try again later";

type Detector = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Decides whether a response body carries a rejection marker
#[derive(Clone)]
pub struct RejectionPolicy {
    detect: Arc<Detector>,
}

impl RejectionPolicy {
    /// Reject bodies containing any of `markers`
    #[must_use]
    pub fn markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers
            .into_iter()
            .map(Into::into)
            .filter(|m| !m.is_empty())
            .collect();
        Self::from_fn(move |body| markers.iter().find(|m| body.contains(m.as_str())).cloned())
    }

    /// Reject bodies for which `detect` returns a marker
    #[must_use]
    pub fn from_fn<F>(detect: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            detect: Arc::new(detect),
        }
    }

    /// Never reject on body content
    #[must_use]
    pub fn never() -> Self {
        Self::from_fn(|_| None)
    }

    /// Marker found in `body`, if any
    #[must_use]
    pub fn detect(&self, body: &str) -> Option<String> {
        (self.detect)(body)
    }
}

impl Default for RejectionPolicy {
    fn default() -> Self {
        Self::markers([DEFAULT_MARKER])
    }
}

impl fmt::Debug for RejectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectionPolicy").finish_non_exhaustive()
    }
}
