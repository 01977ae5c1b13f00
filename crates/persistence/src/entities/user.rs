//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{User, UserType};
use sqlx::FromRow;

/// Database enum for `user_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_type", rename_all = "lowercase")]
pub enum UserTypeDb {
    Resident,
    Manager,
}

impl From<UserType> for UserTypeDb {
    fn from(value: UserType) -> Self {
        match value {
            UserType::Resident => Self::Resident,
            UserType::Manager => Self::Manager,
        }
    }
}

impl From<UserTypeDb> for UserType {
    fn from(value: UserTypeDb) -> Self {
        match value {
            UserTypeDb::Resident => Self::Resident,
            UserTypeDb::Manager => Self::Manager,
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub user_type: UserTypeDb,
    pub telegram_user: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            password_hash: entity.password_hash,
            email: entity.email,
            phone: entity.phone,
            full_name: entity.full_name,
            user_type: entity.user_type.into(),
            telegram_user: entity.telegram_user,
            telegram_chat_id: entity.telegram_chat_id,
            created_at: entity.created_at,
        }
    }
}
