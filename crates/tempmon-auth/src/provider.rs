//! Client for the view token endpoint

use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::token::Token;

/// Path of the view token endpoint on the tempmon server
pub const VIEW_TOKEN_PATH: &str = "/api/auth/viewtoken";

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token endpoint returned {status} {status_text}")]
    Rejected { status: u16, status_text: String },
    #[error("Token response is malformed: {0}")]
    Malformed(String),
    #[error("Token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl TokenError {
    /// Transport failures and server errors may succeed on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            TokenError::Transport(_) => true,
            TokenError::Rejected { status, .. } => *status >= 500,
            TokenError::Malformed(_) => false,
        }
    }
}

/// Fetches viewer tokens; every call hits the endpoint
#[derive(Debug, Clone)]
pub struct TokenProvider {
    client: reqwest::Client,
    endpoint: String,
    retries: u32,
    retry_delay: Duration,
}

impl TokenProvider {
    /// `base_url` is the server root, e.g. `http://localhost:5000`
    pub fn new(base_url: &str) -> Result<Self, TokenError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), VIEW_TOKEN_PATH),
            retries: 0,
            retry_delay: Duration::from_millis(250),
        })
    }

    /// Retry transport failures and 5xx responses up to `retries` times
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn get_token(&self) -> Result<Token, TokenError> {
        let mut attempt = 0;
        loop {
            match self.request().await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(endpoint = %self.endpoint, attempt, error = %e, "Token request failed, retrying");
                    tokio::time::sleep(self.retry_delay * attempt).await;
                }
                result => return result,
            }
        }
    }

    async fn request(&self) -> Result<Token, TokenError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Rejected {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.bytes().await?;
        let token: Token =
            serde_json::from_slice(&body).map_err(|e| TokenError::Malformed(e.to_string()))?;
        if !token.is_usable() {
            return Err(TokenError::Malformed("empty access_token".to_string()));
        }

        debug!(endpoint = %self.endpoint, expires_in = token.expires_in, "Fetched view token");
        Ok(token)
    }
}
