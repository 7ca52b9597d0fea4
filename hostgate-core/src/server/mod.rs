//! HTTP server wiring

use crate::api;
use crate::cache::{CacheBackend, CacheOperations};
use crate::config::Config;
use crate::identity::HttpIdentityProvider;
use crate::middleware::{
    edge_router_middleware, path_guard_middleware, EdgeState, ObservabilityLayer,
    SanitizedMakeSpan,
};
use crate::proxy::{self, UpstreamClient};
use crate::repository::{ProfileRepositoryImpl, TenantRepositoryImpl};
use crate::routing::{EdgeRouter, IdentityGate};
use crate::service::TenantResolver;
use crate::state::HasServices;
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Production application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub cache: Arc<CacheBackend>,
    pub edge_router: Arc<EdgeRouter<HttpIdentityProvider, ProfileRepositoryImpl>>,
    pub tenant_resolver: Arc<TenantResolver<TenantRepositoryImpl, CacheBackend>>,
    pub upstream: UpstreamClient,
    pub prometheus_handle: Option<PrometheusHandle>,
}

#[async_trait]
impl HasServices for AppState {
    type Identity = HttpIdentityProvider;
    type ProfileRepo = ProfileRepositoryImpl;
    type TenantRepo = TenantRepositoryImpl;
    type Cache = CacheBackend;

    fn config(&self) -> &Config {
        &self.config
    }

    fn edge_router(&self) -> &Arc<EdgeRouter<HttpIdentityProvider, ProfileRepositoryImpl>> {
        &self.edge_router
    }

    fn tenant_resolver(&self) -> &TenantResolver<TenantRepositoryImpl, CacheBackend> {
        &self.tenant_resolver
    }

    fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        self.prometheus_handle.as_ref()
    }

    async fn check_ready(&self) -> bool {
        let db_ok = sqlx::query("SELECT 1")
            .execute(&self.db_pool)
            .await
            .is_ok();
        let cache_ok = self.cache.ping().await.is_ok();
        db_ok && cache_ok
    }
}

/// Run the HTTP server
pub async fn run(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<()> {
    let config = Arc::new(config);

    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let cache = Arc::new(CacheBackend::from_config(&config.redis).await?);
    match cache.as_ref() {
        CacheBackend::Redis(_) => info!("Connected to Redis"),
        CacheBackend::Disabled(_) => info!("Tenant cache disabled"),
    }

    let identity = Arc::new(
        HttpIdentityProvider::new(&config.identity).context("Failed to build identity client")?,
    );
    let profile_repo = Arc::new(ProfileRepositoryImpl::new(db_pool.clone()));
    let tenant_repo = Arc::new(TenantRepositoryImpl::new(db_pool.clone()));

    let routing = Arc::new(config.routing.clone());
    let gate = IdentityGate::new(
        identity,
        profile_repo,
        config.identity.timeout,
        config.identity.refresh_skew,
        routing.login_path.clone(),
        routing.portal_prefix.clone(),
    );
    let edge_router = Arc::new(EdgeRouter::new(routing.clone(), gate));
    let tenant_resolver = Arc::new(TenantResolver::new(
        tenant_repo,
        cache.clone(),
        routing.root_domain.clone(),
    ));
    let upstream = UpstreamClient::new(&config.upstream, routing.environment)?;

    let state = AppState {
        config: config.clone(),
        db_pool,
        cache,
        edge_router,
        tenant_resolver,
        upstream,
        prometheus_handle,
    };

    let app = build_router(state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("Failed to bind {}", http_addr))?;
    info!(
        root_domain = %routing.root_domain,
        environment = %routing.environment,
        "HTTP server started on {}",
        http_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Build the HTTP router
///
/// Request order: observability, tracing, dot-segment guard, edge routing,
/// then either a local endpoint or the upstream forwarder.
pub fn build_router<S: HasServices>(state: S) -> Router {
    let edge_state = EdgeState::new(
        state.edge_router().clone(),
        Arc::new(state.config().session_cookie.clone()),
    );

    Router::new()
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::health::metrics::<S>))
        .fallback(proxy::proxy_handler::<S>)
        .layer(axum::middleware::from_fn_with_state(
            edge_state,
            edge_router_middleware::<S::Identity, S::ProfileRepo>,
        ))
        .layer(axum::middleware::from_fn(path_guard_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(ObservabilityLayer)
        .with_state(state)
}
