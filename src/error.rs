//! Error taxonomy for the QuickPin client.
//!
//! Every failure surfaces to the caller immediately. Nothing in this crate
//! retries or swallows an error; the command layer decides what to print.

use thiserror::Error;

/// Errors produced by the QuickPin client.
#[derive(Debug, Error)]
pub enum QpiError {
    /// The authentication endpoint answered but did not hand out a token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Any non-2xx response. Fatal for the current command.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// No usable identifiers were found in the input.
    #[error("Empty file")]
    EmptyInput,

    /// Transport-level failure (connect, TLS, dropped stream, timeout).
    #[error("connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl QpiError {
    /// HTTP status code, if this is an [`QpiError::Http`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            QpiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QpiError>;

/// Turn a non-2xx response into [`QpiError::Http`], passing successes through.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(QpiError::Http {
        status: status.as_u16(),
        body,
    })
}
