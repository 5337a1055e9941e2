//! Client and submission configuration.
//!
//! [`ClientConfig`] and [`SubmitOptions`] are plain values built once by the
//! command layer and handed to the client. The library never looks at
//! environment variables; the `qpi` binary resolves flags, environment and
//! the optional TOML file ([`FileConfig`]) into these values.
//!
//! ```toml
//! [server]
//! url = "https://quickpin.example.com"
//! verify_tls = true
//! timeout_secs = 30
//!
//! [auth]
//! username = "analyst@example.com"
//!
//! [submit]
//! stub = false
//! chunk = 10
//! interval = 5
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{QpiError, Result};

/// Connection settings for a [`crate::client::QuickPin`] client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the QuickPin deployment, e.g. `https://quickpin.example.com`.
    pub base_url: String,
    /// Verify server certificates. Disabling this is insecure.
    pub verify_tls: bool,
    /// Per-request timeout in seconds. `0` leaves the transport default.
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            verify_tls: true,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Request timeout, or `None` when the transport default applies.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Batching parameters for profile submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Ask the server for shallow (stub) ingestion.
    pub stub: bool,
    /// Profiles per request. Must be at least 1.
    pub chunk_size: usize,
    /// Pause between consecutive requests, in seconds.
    pub interval_secs: u64,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            stub: false,
            chunk_size: default_chunk(),
            interval_secs: default_interval(),
        }
    }
}

impl SubmitOptions {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(QpiError::Config("chunk size must be >= 1".to_string()));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Contents of the optional `qpi.toml` file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub submit: SubmitSection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: None,
            verify_tls: true,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthSection {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SubmitSection {
    #[serde(default)]
    pub stub: bool,
    #[serde(default = "default_chunk")]
    pub chunk: usize,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

impl Default for SubmitSection {
    fn default() -> Self {
        Self {
            stub: false,
            chunk: default_chunk(),
            interval: default_interval(),
        }
    }
}

fn default_verify_tls() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_chunk() -> usize {
    1
}
fn default_interval() -> u64 {
    5
}

pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        QpiError::Config(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(content)
        .map_err(|e| QpiError::Config(format!("failed to parse config file: {}", e)))?;

    if config.submit.chunk == 0 {
        return Err(QpiError::Config("submit.chunk must be >= 1".to_string()));
    }

    if let Some(ref url) = config.server.url {
        url::Url::parse(url)?;
    }

    Ok(config)
}
