//! Apartment repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;

use domain::models::{Apartment, ApartmentUpdate, NewApartment};
use domain::ports::{ApartmentRepository, RepoResult};

use super::map_db_error;
use crate::entities::ApartmentEntity;
use crate::metrics::QueryTimer;

/// PostgreSQL implementation of [`ApartmentRepository`].
#[derive(Clone)]
pub struct PgApartmentRepository {
    pool: PgPool,
}

impl PgApartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ApartmentRepository for PgApartmentRepository {
    async fn create(&self, apartment: NewApartment) -> RepoResult<Apartment> {
        let timer = QueryTimer::new("create_apartment");
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let created = sqlx::query_as::<_, ApartmentEntity>(
            r#"
            INSERT INTO apartments (apartment_name, address, units_count, manager_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, apartment_name, address, units_count, manager_id, created_at
            "#,
        )
        .bind(&apartment.apartment_name)
        .bind(&apartment.address)
        .bind(apartment.units_count)
        .bind(apartment.manager_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_error)?;

        sqlx::query(
            "INSERT INTO user_apartments (user_id, apartment_id, is_manager) VALUES ($1, $2, TRUE)",
        )
        .bind(apartment.manager_id)
        .bind(created.id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        timer.record();
        Ok(created.into())
    }

    async fn find_by_id(&self, apartment_id: i64) -> RepoResult<Option<Apartment>> {
        let timer = QueryTimer::new("find_apartment_by_id");
        let result = sqlx::query_as::<_, ApartmentEntity>(
            r#"
            SELECT id, apartment_name, address, units_count, manager_id, created_at
            FROM apartments
            WHERE id = $1
            "#,
        )
        .bind(apartment_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(Apartment::from))
    }

    async fn list_for_member(&self, user_id: i64) -> RepoResult<Vec<Apartment>> {
        let timer = QueryTimer::new("list_apartments_for_member");
        let result = sqlx::query_as::<_, ApartmentEntity>(
            r#"
            SELECT a.id, a.apartment_name, a.address, a.units_count, a.manager_id, a.created_at
            FROM apartments a
            JOIN user_apartments ua ON ua.apartment_id = a.id
            WHERE ua.user_id = $1
            ORDER BY a.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_db_error)?
            .into_iter()
            .map(Apartment::from)
            .collect())
    }

    async fn update(&self, apartment_id: i64, update: ApartmentUpdate) -> RepoResult<Option<Apartment>> {
        let timer = QueryTimer::new("update_apartment");
        let result = sqlx::query_as::<_, ApartmentEntity>(
            r#"
            UPDATE apartments
            SET apartment_name = $2, address = $3, units_count = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, apartment_name, address, units_count, manager_id, created_at
            "#,
        )
        .bind(apartment_id)
        .bind(&update.apartment_name)
        .bind(&update.address)
        .bind(update.units_count)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(Apartment::from))
    }

    async fn delete(&self, apartment_id: i64) -> RepoResult<bool> {
        // Memberships, bills and their payments go with it via ON DELETE CASCADE.
        let timer = QueryTimer::new("delete_apartment");
        let result = sqlx::query("DELETE FROM apartments WHERE id = $1")
            .bind(apartment_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.rows_affected() > 0)
    }
}
