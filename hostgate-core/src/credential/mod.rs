//! Session credential carrier
//!
//! The credential travels in a single cookie as base64url-encoded JSON. A
//! cookie that fails to decode is treated as absent, so a tampered or stale
//! value degrades to an anonymous request rather than an error.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use time::Duration;

use crate::config::SessionCookieConfig;
use crate::domain::{Credential, CredentialUpdate};

/// Encode a credential into its cookie value
pub fn encode_credential(credential: &Credential) -> String {
    // Serializing two strings cannot fail.
    let json = serde_json::to_vec(credential).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cookie value; `None` for anything malformed
pub fn decode_credential(value: &str) -> Option<Credential> {
    let bytes = URL_SAFE_NO_PAD.decode(value.trim()).ok()?;
    let credential: Credential = serde_json::from_slice(&bytes).ok()?;
    if credential.access_token.is_empty() {
        return None;
    }
    Some(credential)
}

/// Read the incoming credential from request headers
pub fn read_credential(headers: &HeaderMap, config: &SessionCookieConfig) -> Option<Credential> {
    let jar = CookieJar::from_headers(headers);
    jar.get(&config.name)
        .and_then(|cookie| decode_credential(cookie.value()))
}

/// Build the `Set-Cookie` for a credential update
pub fn credential_cookie(update: &CredentialUpdate, config: &SessionCookieConfig) -> Cookie<'static> {
    let (value, max_age) = match update {
        CredentialUpdate::Set(credential) => (
            encode_credential(credential),
            Duration::seconds(config.max_age_secs),
        ),
        CredentialUpdate::Clear => (String::new(), Duration::ZERO),
    };

    let mut builder = Cookie::build((config.name.clone(), value))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age);
    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Append the credential update to an outgoing response
pub fn apply_credential_update(
    response: &mut Response,
    update: &CredentialUpdate,
    config: &SessionCookieConfig,
) {
    let cookie = credential_cookie(update, config);
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Failed to encode session cookie: {}", e),
    }
}
