//! Membership repository over the `user_apartments` table.

use async_trait::async_trait;
use sqlx::PgPool;

use domain::models::{Membership, User};
use domain::ports::{MembershipRepository, RepoResult};

use super::map_db_error;
use crate::entities::{MembershipEntity, UserEntity};
use crate::metrics::QueryTimer;

/// PostgreSQL implementation of [`MembershipRepository`].
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn is_manager(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool> {
        let timer = QueryTimer::new("is_apartment_manager");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_apartments
                WHERE user_id = $1 AND apartment_id = $2 AND is_manager = TRUE
            )
            "#,
        )
        .bind(user_id)
        .bind(apartment_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(map_db_error)
    }

    async fn is_member(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool> {
        let timer = QueryTimer::new("is_apartment_member");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_apartments WHERE user_id = $1 AND apartment_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(apartment_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(map_db_error)
    }

    async fn create_membership(
        &self,
        user_id: i64,
        apartment_id: i64,
        is_manager: bool,
    ) -> RepoResult<Membership> {
        let timer = QueryTimer::new("create_membership");
        let result = sqlx::query_as::<_, MembershipEntity>(
            r#"
            INSERT INTO user_apartments (user_id, apartment_id, is_manager)
            VALUES ($1, $2, $3)
            RETURNING user_id, apartment_id, is_manager
            "#,
        )
        .bind(user_id)
        .bind(apartment_id)
        .bind(is_manager)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Membership::from).map_err(map_db_error)
    }

    async fn delete_membership(&self, user_id: i64, apartment_id: i64) -> RepoResult<bool> {
        let timer = QueryTimer::new("delete_membership");
        let result = sqlx::query("DELETE FROM user_apartments WHERE user_id = $1 AND apartment_id = $2")
            .bind(user_id)
            .bind(apartment_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.rows_affected() > 0)
    }

    async fn residents_of(&self, apartment_id: i64) -> RepoResult<Vec<User>> {
        let timer = QueryTimer::new("apartment_residents");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT u.id, u.username, u.password_hash, u.email, u.phone, u.full_name, u.user_type,
                   u.telegram_user, u.telegram_chat_id, u.created_at
            FROM users u
            JOIN user_apartments ua ON ua.user_id = u.id
            WHERE ua.apartment_id = $1
            ORDER BY u.id
            "#,
        )
        .bind(apartment_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_db_error)?
            .into_iter()
            .map(User::from)
            .collect())
    }
}
