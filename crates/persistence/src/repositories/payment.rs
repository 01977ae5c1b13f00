//! Payment repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use domain::models::{Payment, PaymentHistoryEntry};
use domain::ports::{PaymentRepository, RepoResult};

use super::map_db_error;
use crate::entities::{PaymentEntity, PaymentHistoryRow};
use crate::metrics::QueryTimer;

/// PostgreSQL implementation of [`PaymentRepository`].
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn get_pending(&self, user_id: i64) -> RepoResult<Vec<Payment>> {
        let timer = QueryTimer::new("get_pending_payments");
        let result = sqlx::query_as::<_, PaymentEntity>(
            r#"
            SELECT id, bill_id, user_id, amount_cents, status, paid_at, created_at
            FROM payments
            WHERE user_id = $1 AND status = 'pending'
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_db_error)?
            .into_iter()
            .map(Payment::from)
            .collect())
    }

    async fn exists_for(&self, bill_id: i64, user_id: i64) -> RepoResult<bool> {
        let timer = QueryTimer::new("payment_exists_for");
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE bill_id = $1 AND user_id = $2)",
        )
        .bind(bill_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map_err(map_db_error)
    }

    async fn find_by_bill_and_user(&self, bill_id: i64, user_id: i64) -> RepoResult<Option<Payment>> {
        let timer = QueryTimer::new("find_payment_by_bill_and_user");
        let result = sqlx::query_as::<_, PaymentEntity>(
            r#"
            SELECT id, bill_id, user_id, amount_cents, status, paid_at, created_at
            FROM payments
            WHERE bill_id = $1 AND user_id = $2
            "#,
        )
        .bind(bill_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(Payment::from))
    }

    async fn history_for_user(&self, user_id: i64) -> RepoResult<Vec<PaymentHistoryEntry>> {
        let timer = QueryTimer::new("payment_history_for_user");
        let result = sqlx::query_as::<_, PaymentHistoryRow>(
            r#"
            SELECT p.id AS payment_id, p.bill_id, p.user_id, p.amount_cents, p.status, p.paid_at,
                   p.created_at AS payment_created_at,
                   b.apartment_id, b.bill_type, b.total_amount_cents, b.due_date,
                   b.billing_deadline, b.description, b.created_at AS bill_created_at,
                   a.apartment_name
            FROM payments p
            JOIN bills b ON b.id = p.bill_id
            JOIN apartments a ON a.id = b.apartment_id
            WHERE p.user_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_db_error)?
            .into_iter()
            .map(PaymentHistoryEntry::from)
            .collect())
    }

    async fn create_pending(
        &self,
        bill_id: i64,
        user_id: i64,
        amount_cents: i64,
    ) -> RepoResult<Option<Payment>> {
        let timer = QueryTimer::new("create_pending_payment");
        let result = sqlx::query_as::<_, PaymentEntity>(
            r#"
            INSERT INTO payments (bill_id, user_id, amount_cents, status)
            VALUES ($1, $2, $3, 'pending')
            ON CONFLICT (bill_id, user_id) DO NOTHING
            RETURNING id, bill_id, user_id, amount_cents, status, paid_at, created_at
            "#,
        )
        .bind(bill_id)
        .bind(user_id)
        .bind(amount_cents)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(Payment::from))
    }

    async fn bulk_set_paid(
        &self,
        user_id: i64,
        payment_ids: &[i64],
        paid_at: DateTime<Utc>,
    ) -> RepoResult<Vec<i64>> {
        let timer = QueryTimer::new("bulk_set_paid");
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE payments
            SET status = 'paid', paid_at = $3, updated_at = NOW()
            WHERE id = ANY($1) AND user_id = $2 AND status = 'pending'
            RETURNING id
            "#,
        )
        .bind(payment_ids)
        .bind(user_id)
        .bind(paid_at)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;
        updated.sort_unstable();

        tx.commit().await.map_err(map_db_error)?;
        timer.record();
        Ok(updated)
    }
}
