//! User repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;

use domain::models::{NewUser, ProfileUpdate, User};
use domain::ports::{RepoResult, RepositoryError, UserRepository};

use super::map_db_error;
use crate::entities::{UserEntity, UserTypeDb};
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str = "id, username, password_hash, email, phone, full_name, user_type, \
                            telegram_user, telegram_chat_id, created_at";

/// PostgreSQL implementation of [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_one(&self, query_name: &'static str, column: &str, value: &str) -> RepoResult<Option<User>> {
        let timer = QueryTimer::new(query_name);
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(User::from))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn resolve_by_handle(&self, handle: &str) -> RepoResult<Option<User>> {
        self.find_one("find_user_by_telegram_user", "telegram_user", handle)
            .await
    }

    async fn find_by_id(&self, user_id: i64) -> RepoResult<Option<User>> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.find_one("find_user_by_username", "username", username)
            .await
    }

    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (username, password_hash, email, phone, full_name, user_type, telegram_user)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.full_name)
        .bind(UserTypeDb::from(user.user_type))
        .bind(&user.telegram_user)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(User::from).map_err(map_db_error)
    }

    async fn set_telegram_chat_id(&self, handle: &str, chat_id: i64) -> RepoResult<bool> {
        let timer = QueryTimer::new("set_telegram_chat_id");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET telegram_chat_id = $2, updated_at = NOW()
            WHERE telegram_user = $1
            "#,
        )
        .bind(handle)
        .bind(chat_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.rows_affected() > 0)
    }

    async fn list_all(&self) -> RepoResult<Vec<User>> {
        let timer = QueryTimer::new("list_users");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_db_error)?
            .into_iter()
            .map(User::from)
            .collect())
    }

    async fn update_profile(&self, user_id: i64, update: ProfileUpdate) -> RepoResult<Option<User>> {
        let timer = QueryTimer::new("update_user_profile");
        let (handle_changed, handle) = match update.telegram_user {
            Some(handle) => (true, handle),
            None => (false, None),
        };
        // SET expressions read the pre-update row, so the chat id is cleared
        // only when the stored handle actually differs.
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                full_name = COALESCE($5, full_name),
                telegram_chat_id = CASE
                    WHEN $6 AND $7::varchar IS DISTINCT FROM telegram_user THEN NULL
                    ELSE telegram_chat_id
                END,
                telegram_user = CASE WHEN $6 THEN $7::varchar ELSE telegram_user END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(&update.full_name)
        .bind(handle_changed)
        .bind(&handle)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(User::from))
    }

    async fn delete(&self, user_id: i64) -> RepoResult<bool> {
        let timer = QueryTimer::new("delete_user");
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await;
        timer.record();
        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            // apartments.manager_id is ON DELETE RESTRICT.
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23503") => {
                Err(RepositoryError::Conflict(
                    db_err
                        .constraint()
                        .unwrap_or("apartments_manager_id_fkey")
                        .to_string(),
                ))
            }
            Err(err) => Err(map_db_error(err)),
        }
    }
}
