//! HTTP identity provider client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use super::{IdentityError, IdentityProvider, IdentityResult};
use crate::config::IdentityConfig;
use crate::domain::{Credential, Identity, Session};

/// Identity provider reached over its HTTP session API
#[derive(Clone)]
pub struct HttpIdentityProvider {
    base_url: String,
    api_key: Option<String>,
    http_client: Client,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    #[serde(default)]
    identity_id: Option<String>,
}

impl HttpIdentityProvider {
    /// Create a new client; requests are bounded by the configured timeout
    pub fn new(config: &IdentityConfig) -> IdentityResult<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client,
        })
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> IdentityResult<reqwest::Response> {
        self.with_api_key(request).send().await.map_err(|e| {
            if e.is_timeout() {
                IdentityError::Timeout
            } else {
                IdentityError::Unavailable(format!("Failed to {}: {}", operation, e))
            }
        })
    }

    /// Map a bearer-authenticated lookup: success parses the body, an
    /// unauthenticated status means "no session", anything else is an error.
    async fn parse_lookup<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> IdentityResult<Option<T>> {
        match response.status() {
            status if status.is_success() => {
                let value = response.json::<T>().await.map_err(|e| {
                    IdentityError::InvalidResponse(format!("Failed to parse {}: {}", operation, e))
                })?;
                Ok(Some(value))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(IdentityError::Unavailable(format!(
                    "Failed to {}: {} - {}",
                    operation, status, body
                )))
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_session(&self, credential: &Credential) -> IdentityResult<Option<Session>> {
        let url = format!("{}/session", self.base_url);
        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&credential.access_token);

        let response = self.send(request, "get session").await?;
        Self::parse_lookup(response, "session").await
    }

    async fn get_current_user(&self, credential: &Credential) -> IdentityResult<Option<Identity>> {
        let url = format!("{}/user", self.base_url);
        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&credential.access_token);

        let response = self.send(request, "get user").await?;
        Self::parse_lookup(response, "user").await
    }

    async fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> IdentityResult<Option<(Session, Credential)>> {
        let url = format!("{}/token", self.base_url);
        let request = self
            .http_client
            .post(&url)
            .query(&[("grant_type", "refresh_token")])
            .json(&RefreshRequest { refresh_token });

        let response = self.send(request, "refresh session").await?;

        match response.status() {
            status if status.is_success() => {
                let refreshed: RefreshResponse = response.json().await.map_err(|e| {
                    IdentityError::InvalidResponse(format!("Failed to parse token response: {}", e))
                })?;

                let session = Session {
                    identity_id: refreshed.identity_id,
                    expires_at: refreshed.expires_at,
                };
                // Providers that do not rotate refresh tokens omit the field.
                let credential = Credential::new(
                    refreshed.access_token,
                    refreshed
                        .refresh_token
                        .or_else(|| Some(refresh_token.to_string())),
                );
                Ok(Some((session, credential)))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Ok(None),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(IdentityError::Unavailable(format!(
                    "Failed to refresh session: {} - {}",
                    status, body
                )))
            }
        }
    }
}
