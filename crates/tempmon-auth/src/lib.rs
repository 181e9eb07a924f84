//! Tempmon Auth - Viewer access tokens
//!
//! - [`TokenProvider`]: the browser-side call to `POST /api/auth/viewtoken`
//! - [`CredentialExchange`]: the server-side client-credentials request that
//!   backs that endpoint

pub mod exchange;
pub mod provider;
pub mod token;

pub use exchange::{CredentialExchange, Credentials, ExchangeError};
pub use provider::{TokenError, TokenProvider, VIEW_TOKEN_PATH};
pub use token::Token;
