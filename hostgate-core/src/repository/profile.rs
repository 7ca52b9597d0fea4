//! Profile repository

use crate::domain::UserProfile;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_identity(&self, identity_id: &str) -> Result<Option<UserProfile>>;
}

pub struct ProfileRepositoryImpl {
    pool: MySqlPool,
}

impl ProfileRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfileRepositoryImpl {
    async fn find_by_identity(&self, identity_id: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT identity_id, role, account_id
            FROM profiles
            WHERE identity_id = ?
            LIMIT 1
            "#,
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
