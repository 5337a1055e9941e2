//! Token acquisition.
//!
//! A client is authenticated either by exchanging an email/password pair at
//! `POST /api/authentication/` or by reusing a token obtained earlier.

use serde::Serialize;
use std::fmt;
use tracing::debug;
use url::Url;

use crate::error::{check_status, QpiError, Result};

pub(crate) const AUTH_PATH: &str = "api/authentication/";

/// Header carrying the token on every authenticated request.
pub const AUTH_HEADER: &str = "X-Auth";

/// Login credentials. Used once and dropped.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer token issued by the server.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// How a [`crate::client::QuickPin`] client obtains its token.
#[derive(Debug, Clone)]
pub enum Auth {
    /// Log in with email and password.
    Credentials(Credentials),
    /// Skip the login round-trip and use this token as-is.
    Token(Token),
}

/// Exchange credentials for a token. Not retried.
pub async fn authenticate(
    http: &reqwest::Client,
    base: &Url,
    credentials: &Credentials,
) -> Result<Token> {
    let url = base.join(AUTH_PATH)?;
    debug!(%url, email = %credentials.email, "requesting token");

    let response = http.post(url).json(credentials).send().await?;
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|_| QpiError::Authentication("response is not JSON".to_string()))?;
    parse_token(&json)
}

/// Pull the `token` field out of an authentication response.
pub fn parse_token(json: &serde_json::Value) -> Result<Token> {
    match json.get("token").and_then(|t| t.as_str()) {
        Some(t) if !t.is_empty() => Ok(Token::new(t)),
        Some(_) => Err(QpiError::Authentication(
            "server returned an empty token".to_string(),
        )),
        None => Err(QpiError::Authentication(
            "response has no token field".to_string(),
        )),
    }
}
