//! Tenant (site) resolution repository

use crate::domain::TenantDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<TenantDescriptor>>;
    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<TenantDescriptor>>;
}

pub struct TenantRepositoryImpl {
    pool: MySqlPool,
}

impl TenantRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for TenantRepositoryImpl {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<TenantDescriptor>> {
        let site = sqlx::query_as::<_, TenantDescriptor>(
            r#"
            SELECT id, subdomain, custom_domain, name
            FROM sites
            WHERE subdomain = ?
            "#,
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }

    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<TenantDescriptor>> {
        let site = sqlx::query_as::<_, TenantDescriptor>(
            r#"
            SELECT id, subdomain, custom_domain, name
            FROM sites
            WHERE custom_domain = ?
            "#,
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(site)
    }
}
