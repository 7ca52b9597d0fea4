//! Dot-segment guard
//!
//! Rewrites prepend an internal namespace to the incoming path, so a `..`
//! segment could climb out of that namespace once the upstream normalizes
//! it. Such requests are rejected before routing.

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::error::AppError;

/// Returns `true` if any segment is `.` or `..`, including percent-encoded
/// dots and encoded `/` or `\` separators.
fn has_dot_segments(path: &str) -> bool {
    let decoded = path
        .to_ascii_lowercase()
        .replace("%2e", ".")
        .replace("%2f", "/")
        .replace("%5c", "/")
        .replace('\\', "/");
    decoded.split('/').any(|seg| seg == "." || seg == "..")
}

pub async fn path_guard_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if has_dot_segments(request.uri().path()) {
        tracing::debug!("Rejected path with dot segments");
        return Err(AppError::BadRequest("Invalid path".to_string()));
    }
    Ok(next.run(request).await)
}
