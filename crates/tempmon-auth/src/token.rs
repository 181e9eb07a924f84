//! Access token returned to the viewer

use serde::{Deserialize, Serialize};

/// Viewer access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Token {
    /// A token with an empty access token is never usable
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// The shape the viewer expects: `{access_token, expires_in}`
    pub fn for_viewer(&self) -> Self {
        Self {
            access_token: self.access_token.clone(),
            expires_in: self.expires_in,
            token_type: None,
        }
    }
}
