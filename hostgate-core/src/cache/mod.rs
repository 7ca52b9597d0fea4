//! Redis cache layer for tenant descriptors
//!
//! Read-through cache at the collaborator boundary; the routing decision never
//! consults it.

use crate::config::RedisConfig;
use crate::domain::TenantDescriptor;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Cache key prefixes
mod keys {
    pub const TENANT_BY_LABEL: &str = "hostgate:tenant";
}

/// Default TTLs
mod ttl {
    pub const TENANT_SECS: u64 = 300; // 5 minutes
}

fn tenant_key(label: &str) -> String {
    format!("{}:{}", keys::TENANT_BY_LABEL, label)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheOperations: Send + Sync {
    async fn ping(&self) -> Result<()>;
    async fn get_tenant(&self, label: &str) -> Result<Option<TenantDescriptor>>;
    async fn set_tenant(&self, label: &str, tenant: &TenantDescriptor) -> Result<()>;
}

/// Cache manager for Redis operations
#[derive(Clone)]
pub struct CacheManager {
    conn: ConnectionManager,
}

impl CacheManager {
    /// Create a new cache manager
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { conn })
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;

        match value {
            Some(v) => {
                let parsed = serde_json::from_str(&v)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Cache deserialize error: {}", e)))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let serialized = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Cache serialize error: {}", e)))?;

        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheOperations for CacheManager {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get_tenant(&self, label: &str) -> Result<Option<TenantDescriptor>> {
        self.get(&tenant_key(label)).await
    }

    async fn set_tenant(&self, label: &str, tenant: &TenantDescriptor) -> Result<()> {
        self.set(&tenant_key(label), tenant, Duration::from_secs(ttl::TENANT_SECS))
            .await
    }
}

/// Cache that stores nothing; used when caching is disabled and in tests
#[derive(Clone, Default)]
pub struct NoOpCacheManager;

impl NoOpCacheManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheOperations for NoOpCacheManager {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_tenant(&self, _label: &str) -> Result<Option<TenantDescriptor>> {
        Ok(None)
    }

    async fn set_tenant(&self, _label: &str, _tenant: &TenantDescriptor) -> Result<()> {
        Ok(())
    }
}

/// Cache selected at startup from `TENANT_CACHE_ENABLED`
#[derive(Clone)]
pub enum CacheBackend {
    Redis(CacheManager),
    Disabled(NoOpCacheManager),
}

impl CacheBackend {
    pub async fn from_config(config: &RedisConfig) -> Result<Self> {
        if config.tenant_cache_enabled {
            Ok(CacheBackend::Redis(CacheManager::new(config).await?))
        } else {
            Ok(CacheBackend::Disabled(NoOpCacheManager::new()))
        }
    }
}

#[async_trait]
impl CacheOperations for CacheBackend {
    async fn ping(&self) -> Result<()> {
        match self {
            CacheBackend::Redis(cache) => cache.ping().await,
            CacheBackend::Disabled(cache) => cache.ping().await,
        }
    }

    async fn get_tenant(&self, label: &str) -> Result<Option<TenantDescriptor>> {
        match self {
            CacheBackend::Redis(cache) => cache.get_tenant(label).await,
            CacheBackend::Disabled(cache) => cache.get_tenant(label).await,
        }
    }

    async fn set_tenant(&self, label: &str, tenant: &TenantDescriptor) -> Result<()> {
        match self {
            CacheBackend::Redis(cache) => cache.set_tenant(label, tenant).await,
            CacheBackend::Disabled(cache) => cache.set_tenant(label, tenant).await,
        }
    }
}
