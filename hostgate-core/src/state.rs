//! Application state traits for dependency injection
//!
//! Handlers and the router builder are generic over [`HasServices`], so the
//! production [`AppState`](crate::server::AppState) and test states with
//! in-memory collaborators share the same wiring.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::cache::CacheOperations;
use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::proxy::UpstreamClient;
use crate::repository::{ProfileRepository, TenantRepository};
use crate::routing::EdgeRouter;
use crate::service::TenantResolver;

#[async_trait]
pub trait HasServices: Clone + Send + Sync + 'static {
    type Identity: IdentityProvider + 'static;
    type ProfileRepo: ProfileRepository + 'static;
    type TenantRepo: TenantRepository + 'static;
    type Cache: CacheOperations + 'static;

    fn config(&self) -> &Config;

    fn edge_router(&self) -> &Arc<EdgeRouter<Self::Identity, Self::ProfileRepo>>;

    fn tenant_resolver(&self) -> &TenantResolver<Self::TenantRepo, Self::Cache>;

    fn upstream(&self) -> &UpstreamClient;

    /// Handle for rendering `/metrics`; `None` when metrics are disabled
    fn prometheus_handle(&self) -> Option<&PrometheusHandle>;

    /// Whether backing stores are reachable
    async fn check_ready(&self) -> bool;
}
