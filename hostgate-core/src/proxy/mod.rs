//! Upstream forwarder
//!
//! Rewritten requests are served by the rendering upstream. The edge
//! middleware has already replaced the path; this module forwards the request
//! with routing context attached as `x-hostgate-*` headers.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, Request,
    },
    response::Response,
};
use url::Url;

use crate::config::{Environment, UpstreamConfig};
use crate::domain::{RouteArea, RouteOutcome};
use crate::error::{AppError, Result};
use crate::state::HasServices;

pub const AREA_HEADER: &str = "x-hostgate-area";
pub const TENANT_HEADER: &str = "x-hostgate-tenant";
pub const IDENTITY_HEADER: &str = "x-hostgate-identity";
pub const ROLE_HEADER: &str = "x-hostgate-role";

const INTERNAL_HEADER_PREFIX: &str = "x-hostgate-";

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Request headers safe to send upstream
fn forwardable_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name)
            || name == header::HOST
            || name == header::CONTENT_LENGTH
            || name.as_str().starts_with(INTERNAL_HEADER_PREFIX)
        {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

/// HTTP client for the rendering upstream
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    max_body_bytes: usize,
    scheme: &'static str,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, environment: Environment) -> anyhow::Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| anyhow::anyhow!("Invalid UPSTREAM_URL {}: {}", config.url, e))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            max_body_bytes: config.max_body_bytes,
            scheme: environment.scheme(),
        })
    }

    /// Forward a request upstream, adding `context` headers after stripping
    /// any client-supplied internal headers.
    pub async fn forward(&self, request: Request<Body>, context: HeaderMap) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| AppError::BadRequest("Request body too large".to_string()))?;

        let mut headers = forwardable_request_headers(&parts.headers);
        if let Some(host) = parts.headers.get(header::HOST) {
            headers.insert("x-forwarded-host", host.clone());
        }
        headers.insert("x-forwarded-proto", HeaderValue::from_static(self.scheme));
        for (name, value) in context.iter() {
            headers.insert(name.clone(), value.clone());
        }

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Upstream("upstream timed out".to_string())
                } else {
                    AppError::Upstream(e.to_string())
                }
            })?;

        let status = upstream.status();
        let mut response_headers = HeaderMap::with_capacity(upstream.headers().len());
        for (name, value) in upstream.headers() {
            if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
                continue;
            }
            response_headers.append(name.clone(), value.clone());
        }
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid routing header value: {}", e)))
}

/// Fallback handler: forward the (possibly rewritten) request upstream
pub async fn proxy_handler<S: HasServices>(
    State(state): State<S>,
    request: Request<Body>,
) -> Result<Response> {
    let outcome = request.extensions().get::<RouteOutcome>().cloned();
    let mut context = HeaderMap::new();

    if let Some(outcome) = outcome {
        context.insert(AREA_HEADER, HeaderValue::from_static(outcome.area.as_str()));

        if let RouteArea::Tenant { label } = &outcome.area {
            let tenant = state
                .tenant_resolver()
                .resolve(label)
                .await?
                .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;
            context.insert(TENANT_HEADER, header_value(&tenant.id)?);
        }

        if let Some(identity) = &outcome.identity {
            context.insert(IDENTITY_HEADER, header_value(&identity.identity_id)?);
            context.insert(ROLE_HEADER, HeaderValue::from_static(identity.role.as_str()));
        }
    }

    state.upstream().forward(request, context).await
}
