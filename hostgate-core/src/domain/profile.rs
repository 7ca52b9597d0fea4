//! User profile domain model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role stored on a profile.
///
/// `General` is the lowest-privilege tier; every other role is elevated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    General,
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Role::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::General => "general",
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

/// Unknown role strings fall back to `General`.
impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "member" => Role::Member,
            "admin" => Role::Admin,
            "owner" => Role::Owner,
            _ => Role::General,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::MySql> for Role {
    fn decode(
        value: sqlx::mysql::MySqlValueRef<'r>,
    ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<'r, sqlx::MySql>::decode(value)?;
        Ok(Role::from(s.as_str()))
    }
}

impl sqlx::Type<sqlx::MySql> for Role {
    fn type_info() -> sqlx::mysql::MySqlTypeInfo {
        <String as sqlx::Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
    }
}

/// Profile attached to an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub identity_id: String,
    pub role: Role,
    pub account_id: Option<String>,
}
