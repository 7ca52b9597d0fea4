//! Identity provider boundary
//!
//! The router only observes sessions; issuing, validating and refreshing them
//! is the provider's job. Everything the gate needs goes through the
//! [`IdentityProvider`] trait so the HTTP client can be swapped for mocks.

pub mod client;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Credential, Identity, Session};

pub use client::HttpIdentityProvider;

/// Failures talking to the identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Identity provider timed out")]
    Timeout,

    #[error("Invalid identity provider response: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    /// Metric label for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::Unavailable(_) => "unavailable",
            IdentityError::Timeout => "timeout",
            IdentityError::InvalidResponse(_) => "invalid_response",
        }
    }
}

pub type IdentityResult<T> = std::result::Result<T, IdentityError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session for the credential; `None` when the provider does not
    /// recognize it
    async fn get_session(&self, credential: &Credential) -> IdentityResult<Option<Session>>;

    /// Identity behind the credential; `None` when unknown
    async fn get_current_user(&self, credential: &Credential) -> IdentityResult<Option<Identity>>;

    /// Exchange a refresh token for a new session and credential; `None` when
    /// the refresh token is rejected
    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> IdentityResult<Option<(Session, Credential)>>;
}
