//! HTTP observability middleware
//!
//! Tower Layer/Service that propagates request IDs and records request
//! metrics. Requests are labelled by routed area rather than path, since the
//! proxied path space is unbounded.

use axum::{body::Body, http::Request, response::Response};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::RouteArea;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct ObservabilityLayer;

impl<S> Layer<S> for ObservabilityLayer {
    type Service = ObservabilityMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ObservabilityMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct ObservabilityMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for ObservabilityMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();

        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty() && s.len() <= 128)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if let Ok(value) = request_id.parse() {
            request.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        gauge!("hostgate_http_requests_in_flight").increment(1.0);
        let start = Instant::now();

        // Take the service that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let span = tracing::info_span!("request", request_id = %request_id);

        Box::pin(
            async move {
                let result = inner.call(request).await;
                gauge!("hostgate_http_requests_in_flight").decrement(1.0);
                let mut response = result?;

                let area = response
                    .extensions()
                    .get::<RouteArea>()
                    .map(RouteArea::as_str)
                    .unwrap_or("none");
                let status = response.status().as_u16().to_string();

                counter!(
                    "hostgate_http_requests_total",
                    "method" => method.clone(),
                    "area" => area,
                    "status" => status
                )
                .increment(1);
                histogram!(
                    "hostgate_http_request_duration_seconds",
                    "method" => method,
                    "area" => area
                )
                .record(start.elapsed().as_secs_f64());

                if let Ok(value) = request_id.parse() {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
