//! Two-legged client-credentials exchange with the upstream identity service

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::token::Token;

/// Upstream token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://developer.api.autodesk.com/authentication/v2/token";

/// Read-only scope sufficient for viewing models
pub const DEFAULT_SCOPE: &str = "viewables:read";

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Identity service returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Identity service response is malformed: {0}")]
    Malformed(String),
    #[error("Identity service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client id and secret of the registered application
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct UpstreamToken {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    token_type: Option<String>,
}

/// Exchanges application credentials for an access token
#[derive(Debug, Clone)]
pub struct CredentialExchange {
    client: reqwest::Client,
    token_url: String,
    scope: String,
    credentials: Credentials,
}

impl CredentialExchange {
    pub fn new(credentials: Credentials) -> Result<Self, ExchangeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            credentials,
        })
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    pub async fn exchange(&self) -> Result<Token, ExchangeError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), token_url = %self.token_url, "Credential exchange rejected");
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let upstream: UpstreamToken =
            serde_json::from_slice(&body).map_err(|e| ExchangeError::Malformed(e.to_string()))?;
        let token = Token {
            access_token: upstream.access_token,
            expires_in: upstream.expires_in,
            token_type: upstream.token_type,
        };
        if !token.is_usable() {
            return Err(ExchangeError::Malformed("empty access_token".to_string()));
        }

        debug!(client_id = %self.credentials.client_id, expires_in = token.expires_in, "Exchanged credentials for token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
        Form, Json, Router,
    };
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/token")
    }

    async fn identity(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
        let authorized = headers
            .get(AUTHORIZATION)
            .is_some_and(|v| v == "Basic aWQ6c2VjcmV0");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "bad client").into_response();
        }
        if form.get("grant_type").map(String::as_str) != Some("client_credentials") {
            return (StatusCode::BAD_REQUEST, "bad grant").into_response();
        }
        Json(serde_json::json!({
            "access_token": format!("token-for-{}", form["scope"]),
            "token_type": "Bearer",
            "expires_in": 3599
        }))
        .into_response()
    }

    async fn exchange(credentials: Credentials) -> Result<Token, ExchangeError> {
        let url = serve(Router::new().route("/token", post(identity))).await;
        CredentialExchange::new(credentials)
            .unwrap()
            .with_token_url(url)
            .with_scope("viewables:read")
            .exchange()
            .await
    }

    #[tokio::test]
    async fn test_exchange_success() {
        let token = exchange(Credentials::new("id", "secret")).await.unwrap();
        assert_eq!(token.access_token, "token-for-viewables:read");
        assert_eq!(token.expires_in, 3599);
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
    }

    #[tokio::test]
    async fn test_exchange_rejected() {
        let err = exchange(Credentials::new("id", "wrong")).await.unwrap_err();
        match err {
            ExchangeError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad client");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_secret_not_in_debug() {
        let debug = format!("{:?}", Credentials::new("id", "secret"));
        assert!(debug.contains("id"));
        assert!(!debug.contains("\"secret\""));
    }
}
