//! Request span with secrets removed from the logged URI.
//!
//! Session tokens must never reach logs: the cookie header is not recorded
//! and token-bearing query parameters are redacted.

use axum::http::{header::HOST, Request};
use tower_http::trace::MakeSpan;
use tracing::Span;

const SENSITIVE_PARAMS: &[&str] = &[
    "access_token",
    "refresh_token",
    "token",
    "code",
    "apikey",
    "api_key",
    "password",
];

#[derive(Clone, Debug)]
pub struct SanitizedMakeSpan;

impl<B> MakeSpan<B> for SanitizedMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let host = request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            host = %host,
            uri = %sanitize_uri(request.uri()),
        )
    }
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_PARAMS
        .iter()
        .any(|s| key.eq_ignore_ascii_case(s))
}

/// `/auth/callback?code=abc&next=/` becomes `/auth/callback?code=[REDACTED]&next=/`
fn sanitize_uri(uri: &axum::http::Uri) -> String {
    let Some(query) = uri.query() else {
        return uri.path().to_string();
    };

    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive(key) => format!("{key}=[REDACTED]"),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", uri.path(), pairs.join("&"))
}
