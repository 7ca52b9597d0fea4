//! Tenant (site) descriptor

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Site record resolved from a subdomain or a custom domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TenantDescriptor {
    pub id: String,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub name: String,
}
