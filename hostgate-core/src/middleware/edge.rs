//! Edge routing middleware
//!
//! Applies the [`EdgeRouter`] decision to the live request: redirects are
//! answered here, rewrites replace the request path before the inner service
//! runs, and any credential change is written to the response whatever the
//! decision was.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::HOST, header::LOCATION, uri::PathAndQuery, HeaderValue, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::SessionCookieConfig;
use crate::credential::{apply_credential_update, read_credential};
use crate::domain::{RequestContext, RoutingDecision};
use crate::error::AppError;
use crate::identity::IdentityProvider;
use crate::repository::ProfileRepository;
use crate::routing::EdgeRouter;

/// Shared state for the edge middleware
pub struct EdgeState<I: IdentityProvider, P: ProfileRepository> {
    router: Arc<EdgeRouter<I, P>>,
    cookie: Arc<SessionCookieConfig>,
}

impl<I: IdentityProvider, P: ProfileRepository> EdgeState<I, P> {
    pub fn new(router: Arc<EdgeRouter<I, P>>, cookie: Arc<SessionCookieConfig>) -> Self {
        Self { router, cookie }
    }
}

impl<I: IdentityProvider, P: ProfileRepository> Clone for EdgeState<I, P> {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            cookie: self.cookie.clone(),
        }
    }
}

/// Build the router input from the live request
pub fn request_context(request: &Request<Body>, cookie: &SessionCookieConfig) -> RequestContext {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()));

    RequestContext::new(
        host,
        request.uri().path(),
        request.uri().query().map(str::to_string),
        read_credential(request.headers(), cookie),
    )
}

fn rewrite_uri(uri: &Uri, path: &str) -> Result<Uri, AppError> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| AppError::BadRequest(format!("Invalid rewrite target: {}", e)))?,
    );
    Uri::from_parts(parts).map_err(|e| AppError::BadRequest(format!("Invalid rewrite target: {}", e)))
}

fn redirect_response(location: &str, status: StatusCode) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = status.into_response();
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => AppError::BadRequest("Invalid redirect location".to_string()).into_response(),
    }
}

/// Route the request by host, path and session
pub async fn edge_router_middleware<I, P>(
    State(state): State<EdgeState<I, P>>,
    mut request: Request<Body>,
    next: Next,
) -> Response
where
    I: IdentityProvider + 'static,
    P: ProfileRepository + 'static,
{
    let ctx = request_context(&request, &state.cookie);
    let outcome = state.router.route(&ctx).await;

    let mut response = match &outcome.decision {
        RoutingDecision::Redirect { location, status } => redirect_response(location, *status),
        RoutingDecision::PassThrough => {
            request.extensions_mut().insert(outcome.clone());
            next.run(request).await
        }
        RoutingDecision::InternalRewrite { path } => match rewrite_uri(request.uri(), path) {
            Ok(uri) => {
                *request.uri_mut() = uri;
                request.extensions_mut().insert(outcome.clone());
                next.run(request).await
            }
            Err(e) => e.into_response(),
        },
    };

    if let Some(update) = &outcome.credential {
        apply_credential_update(&mut response, update, &state.cookie);
    }
    response.extensions_mut().insert(outcome.area);
    response
}
