//! API base URL resolution
//!
//! The base URL comes from a runtime config document first and falls back
//! to a value baked in at build time:
//! - runtime: a [`RuntimeConfigSource`] (file, HTTP or static)
//! - baked: `PREFSYNC_API_BASE_URL` at compile time, overridable
//!
//! A source that fails is treated as an empty document. Having neither
//! value is a terminal [`SyncError::ConfigMissing`].

use async_trait::async_trait;
use prefsync_model::{DiagnosticKind, DiagnosticLog, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Base URL compiled into the binary, if any
pub const BAKED_API_BASE: Option<&str> = option_env!("PREFSYNC_API_BASE_URL");

/// Path of the preferences endpoint under the base URL
pub const SETTINGS_PATH: &str = "/api/user/settings";

/// Errors raised while fetching a runtime config document
#[derive(Debug, thiserror::Error)]
pub enum ConfigSourceError {
    /// Reading the config file failed
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Fetching the config document failed
    #[error("failed to fetch config: {0}")]
    Http(#[from] reqwest::Error),

    /// The document is not valid JSON
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime config document (`config.json`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL of the preferences API
    #[serde(rename = "API_BASE_URL", default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

/// Provider of the runtime config document
#[async_trait]
pub trait RuntimeConfigSource: Send + Sync {
    /// Fetch the current document
    async fn fetch(&self) -> Result<RuntimeConfig, ConfigSourceError>;

    /// Short description used in logs
    fn describe(&self) -> String;
}

/// Reads the document from a local JSON file
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    /// Source reading `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RuntimeConfigSource for FileConfigSource {
    async fn fetch(&self) -> Result<RuntimeConfig, ConfigSourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigSourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Fetches the document over HTTP, bypassing caches
///
/// A non-2xx answer is read as an empty document.
#[derive(Debug, Clone)]
pub struct HttpConfigSource {
    client: reqwest::Client,
    url: String,
}

impl HttpConfigSource {
    /// Source fetching `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Source fetching `{origin}/config.json`
    #[must_use]
    pub fn at_origin(origin: &str) -> Self {
        Self::new(format!("{}/config.json", origin.trim_end_matches('/')))
    }
}

#[async_trait]
impl RuntimeConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<RuntimeConfig, ConfigSourceError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(RuntimeConfig::default());
        }
        let raw = response.text().await?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn describe(&self) -> String {
        format!("http {}", self.url)
    }
}

/// Fixed document, used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    config: RuntimeConfig,
}

impl StaticConfigSource {
    /// Source always returning `api_base_url`
    #[must_use]
    pub fn new(api_base_url: Option<String>) -> Self {
        Self {
            config: RuntimeConfig { api_base_url },
        }
    }
}

#[async_trait]
impl RuntimeConfigSource for StaticConfigSource {
    async fn fetch(&self) -> Result<RuntimeConfig, ConfigSourceError> {
        Ok(self.config.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// Validated API base URL without trailing slashes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiBase(String);

impl ApiBase {
    /// Normalise `raw`; blank input yields `None`
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the base URL
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{base}/api/user/settings`
    #[must_use]
    pub fn settings_url(&self) -> String {
        format!("{}{SETTINGS_PATH}", self.0)
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the resolved base URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The runtime config document
    Runtime,
    /// The build-time fallback
    Baked,
}

/// Outcome of base URL resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBase {
    /// Base URL to use
    pub base: ApiBase,
    /// Source of `base`
    pub origin: ConfigOrigin,
}

/// Resolve the API base URL, runtime first, then `baked`
///
/// # Errors
/// - `SyncError::ConfigMissing` if neither source yields a URL
pub async fn resolve_api_base(
    source: &dyn RuntimeConfigSource,
    baked: Option<&str>,
    log: &DiagnosticLog,
) -> Result<ResolvedBase, SyncError> {
    let runtime = match source.fetch().await {
        Ok(config) => config.api_base_url.as_deref().and_then(ApiBase::parse),
        Err(e) => {
            warn!(source = %source.describe(), error = %e, "runtime config unavailable");
            None
        }
    };

    if let Some(base) = runtime {
        log.record(
            DiagnosticKind::Config,
            format!("Using runtime API_BASE_URL: {base}"),
        );
        info!(%base, "using runtime API base URL");
        return Ok(ResolvedBase {
            base,
            origin: ConfigOrigin::Runtime,
        });
    }

    if let Some(base) = baked.and_then(ApiBase::parse) {
        log.record(
            DiagnosticKind::Config,
            format!("Using baked PREFSYNC_API_BASE_URL: {base}"),
        );
        info!(%base, "using baked API base URL");
        return Ok(ResolvedBase {
            base,
            origin: ConfigOrigin::Baked,
        });
    }

    log.record(
        DiagnosticKind::ConfigError,
        "No API base URL found (runtime or baked).",
    );
    error!("no API base URL configured");
    Err(SyncError::ConfigMissing)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    #[async_trait]
    impl RuntimeConfigSource for FailingSource {
        async fn fetch(&self) -> Result<RuntimeConfig, ConfigSourceError> {
            Err(ConfigSourceError::Parse(
                serde_json::from_str::<RuntimeConfig>("{").unwrap_err(),
            ))
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    #[test]
    fn base_trims_trailing_slashes() {
        let base = ApiBase::parse(" https://api.example.com/// ").unwrap();
        assert_eq!(base.as_str(), "https://api.example.com");
        assert_eq!(base.settings_url(), "https://api.example.com/api/user/settings");
        assert!(ApiBase::parse("/").is_none());
        assert!(ApiBase::parse("").is_none());
    }

    #[test]
    fn runtime_document_key() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"API_BASE_URL":"https://x","OTHER":1}"#).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("https://x"));
        let empty: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.api_base_url, None);
    }

    #[tokio::test]
    async fn runtime_wins_over_baked() {
        let log = DiagnosticLog::new();
        let source = StaticConfigSource::new(Some("https://runtime/".to_string()));
        let resolved = resolve_api_base(&source, Some("https://baked"), &log)
            .await
            .unwrap();
        assert_eq!(resolved.origin, ConfigOrigin::Runtime);
        assert_eq!(resolved.base.as_str(), "https://runtime");
        assert!(log.find("[Config] Using runtime API_BASE_URL: https://runtime").is_some());
    }

    #[tokio::test]
    async fn failing_source_falls_back_to_baked() {
        let log = DiagnosticLog::new();
        let resolved = resolve_api_base(&FailingSource, Some("https://baked/"), &log)
            .await
            .unwrap();
        assert_eq!(resolved.origin, ConfigOrigin::Baked);
        assert_eq!(resolved.base.as_str(), "https://baked");
    }

    #[tokio::test]
    async fn nothing_configured_is_terminal() {
        let log = DiagnosticLog::new();
        let source = StaticConfigSource::new(Some("  ".to_string()));
        let err = resolve_api_base(&source, None, &log).await.unwrap_err();
        assert_eq!(err, SyncError::ConfigMissing);
        assert_eq!(log.position(DiagnosticKind::ConfigError), Some(0));
    }
}
