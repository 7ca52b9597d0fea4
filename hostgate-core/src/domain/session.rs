//! Session and credential models observed from the identity provider

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque provider-issued credential carried in the session cookie
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }
}

// Tokens must never reach logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Session record as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub identity_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is expired once `now + skew` reaches its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at <= now + skew
    }
}

/// Identity as returned by the provider's current-user endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Change to the credential carrier produced while routing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialUpdate {
    /// Write a refreshed credential
    Set(Credential),
    /// Remove a credential the provider no longer accepts
    Clear,
}
