//! Authenticated QuickPin client.
//!
//! [`QuickPin::connect`] resolves a token (logging in if needed) and builds a
//! `reqwest` client that sends `X-Auth: <token>` on every request. The
//! submission, query and notification operations hang off this type in
//! their own modules.

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{self, Auth, Token, AUTH_HEADER};
use crate::config::ClientConfig;
use crate::error::{QpiError, Result};

pub struct QuickPin {
    http: reqwest::Client,
    // No total-request timeout: the notification stream stays open indefinitely.
    stream_http: reqwest::Client,
    base: Url,
    token: Token,
}

impl QuickPin {
    /// Authenticate and return a ready client.
    pub async fn connect(config: ClientConfig, auth: Auth) -> Result<Self> {
        let base = parse_base_url(&config.base_url)?;

        if !config.verify_tls {
            warn!(url = %base, "TLS certificate verification is disabled");
        }

        let token = match auth {
            Auth::Token(token) => {
                debug!("using supplied token");
                token
            }
            Auth::Credentials(credentials) => {
                let http = http_builder(&config, HeaderMap::new(), true).build()?;
                auth::authenticate(&http, &base, &credentials).await?
            }
        };

        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(token.as_str()).map_err(|_| {
            QpiError::Authentication("token is not a valid header value".to_string())
        })?;
        headers.insert(AUTH_HEADER, value);
        let http = http_builder(&config, headers.clone(), true).build()?;
        let stream_http = http_builder(&config, headers, false).build()?;

        Ok(Self {
            http,
            stream_http,
            base,
            token,
        })
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn stream_http(&self) -> &reqwest::Client {
        &self.stream_http
    }

    /// Resolve an API path (or absolute URL) against the base URL.
    ///
    /// A leading `/` is ignored, so deployments mounted under a path prefix
    /// keep that prefix.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }
}

fn http_builder(
    config: &ClientConfig,
    headers: HeaderMap,
    total_timeout: bool,
) -> reqwest::ClientBuilder {
    let mut builder = reqwest::Client::builder().default_headers(headers);
    if let Some(timeout) = config.timeout() {
        builder = if total_timeout {
            builder.timeout(timeout)
        } else {
            builder.connect_timeout(timeout)
        };
    }
    if !config.verify_tls {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder
}

/// Parse the base URL, dropping trailing slashes and then adding exactly one
/// so relative joins land under it.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(QpiError::Config("base URL is empty".to_string()));
    }
    Ok(Url::parse(&format!("{}/", trimmed))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_url_trailing_slashes_normalized() {
        let a = parse_base_url("https://qp.example.com").unwrap();
        let b = parse_base_url("https://qp.example.com///").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "https://qp.example.com/");

        let prefixed = parse_base_url("https://example.com/quickpin/").unwrap();
        assert_eq!(
            prefixed.join("api/profile/").unwrap().as_str(),
            "https://example.com/quickpin/api/profile/"
        );
    }

    #[test]
    fn empty_base_url_rejected() {
        assert!(matches!(parse_base_url("  "), Err(QpiError::Config(_))));
        assert!(matches!(parse_base_url("nope"), Err(QpiError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn supplied_token_skips_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/authentication/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "x"})))
            .expect(0)
            .mount(&server)
            .await;

        let client = QuickPin::connect(
            ClientConfig::new(server.uri()),
            Auth::Token(Token::new("pre-issued")),
        )
        .await
        .unwrap();
        assert_eq!(client.token().as_str(), "pre-issued");
    }

    #[tokio::test]
    async fn credentials_are_exchanged_for_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/authentication/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = QuickPin::connect(
            ClientConfig::new(server.uri()),
            Auth::Credentials(Credentials::new("guest", "pw")),
        )
        .await
        .unwrap();
        assert_eq!(client.token().as_str(), "abc123");
    }

    #[tokio::test]
    async fn missing_token_field_fails_connect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/authentication/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let result = QuickPin::connect(
            ClientConfig::new(server.uri()),
            Auth::Credentials(Credentials::new("guest", "pw")),
        )
        .await;
        assert!(matches!(result, Err(QpiError::Authentication(_))));
    }

    #[tokio::test]
    async fn endpoint_resolution() {
        let client = QuickPin::connect(
            ClientConfig::new("https://qp.example.com/base"),
            Auth::Token(Token::new("t")),
        )
        .await
        .unwrap();
        assert_eq!(
            client.endpoint("/api/label/").unwrap().as_str(),
            "https://qp.example.com/base/api/label/"
        );
        assert_eq!(
            client.endpoint("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }
}
