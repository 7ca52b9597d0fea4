//! Tenant resolution for downstream rendering
//!
//! Maps a tenant label produced by the router (a subdomain host or a
//! registered custom domain) to its site descriptor. Cache failures degrade to
//! a store lookup; store failures propagate.

use crate::cache::CacheOperations;
use crate::domain::TenantDescriptor;
use crate::error::Result;
use crate::repository::TenantRepository;
use metrics::counter;
use std::sync::Arc;

pub struct TenantResolver<R: TenantRepository, C: CacheOperations> {
    tenant_repo: Arc<R>,
    cache: Arc<C>,
    root_domain: String,
}

impl<R: TenantRepository, C: CacheOperations> TenantResolver<R, C> {
    pub fn new(tenant_repo: Arc<R>, cache: Arc<C>, root_domain: impl Into<String>) -> Self {
        Self {
            tenant_repo,
            cache,
            root_domain: root_domain.into(),
        }
    }

    /// Subdomain part of a label under the root domain, if any
    fn subdomain_of<'a>(&self, label: &'a str) -> Option<&'a str> {
        label
            .strip_suffix(self.root_domain.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|sub| !sub.is_empty())
    }

    /// Resolve a tenant label; `None` when no site is bound to it
    pub async fn resolve(&self, label: &str) -> Result<Option<TenantDescriptor>> {
        match self.cache.get_tenant(label).await {
            Ok(Some(tenant)) => {
                counter!("hostgate_tenant_cache_total", "outcome" => "hit").increment(1);
                return Ok(Some(tenant));
            }
            Ok(None) => {
                counter!("hostgate_tenant_cache_total", "outcome" => "miss").increment(1);
            }
            Err(e) => {
                counter!("hostgate_tenant_cache_total", "outcome" => "error").increment(1);
                tracing::warn!(label = %label, "Tenant cache read failed: {}", e);
            }
        }

        let tenant = match self.subdomain_of(label) {
            Some(subdomain) => self.tenant_repo.find_by_subdomain(subdomain).await?,
            None => self.tenant_repo.find_by_custom_domain(label).await?,
        };

        if let Some(tenant) = &tenant {
            if let Err(e) = self.cache.set_tenant(label, tenant).await {
                tracing::warn!(label = %label, "Tenant cache write failed: {}", e);
            }
        }

        Ok(tenant)
    }
}
