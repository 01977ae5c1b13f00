//! Bill repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;

use domain::models::{Bill, BillType, NewBill};
use domain::ports::{BillRepository, RepoResult};

use super::map_db_error;
use crate::entities::{BillEntity, BillTypeDb};
use crate::metrics::QueryTimer;

const BILL_COLUMNS: &str = "id, apartment_id, bill_type, total_amount_cents, due_date, \
                            billing_deadline, description, created_at";

/// PostgreSQL implementation of [`BillRepository`].
#[derive(Clone)]
pub struct PgBillRepository {
    pool: PgPool,
}

impl PgBillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BillRepository for PgBillRepository {
    async fn create(&self, apartment_id: i64, bill: NewBill) -> RepoResult<Bill> {
        let timer = QueryTimer::new("create_bill");
        let result = sqlx::query_as::<_, BillEntity>(
            r#"
            INSERT INTO bills (apartment_id, bill_type, total_amount_cents, due_date, billing_deadline, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, apartment_id, bill_type, total_amount_cents, due_date, billing_deadline, description, created_at
            "#,
        )
        .bind(apartment_id)
        .bind(BillTypeDb::from(bill.bill_type))
        .bind(bill.total_amount_cents)
        .bind(bill.due_date)
        .bind(bill.billing_deadline)
        .bind(&bill.description)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Bill::from).map_err(map_db_error)
    }

    async fn find_by_id(&self, bill_id: i64) -> RepoResult<Option<Bill>> {
        let timer = QueryTimer::new("find_bill_by_id");
        let result = sqlx::query_as::<_, BillEntity>(
            r#"
            SELECT id, apartment_id, bill_type, total_amount_cents, due_date, billing_deadline, description, created_at
            FROM bills
            WHERE id = $1
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(Bill::from))
    }

    async fn get_undivided_bills(
        &self,
        apartment_id: i64,
        bill_type: Option<BillType>,
    ) -> RepoResult<Vec<Bill>> {
        let timer = QueryTimer::new("get_undivided_bills");
        let result = sqlx::query_as::<_, BillEntity>(
            r#"
            SELECT b.id, b.apartment_id, b.bill_type, b.total_amount_cents, b.due_date,
                   b.billing_deadline, b.description, b.created_at
            FROM bills b
            WHERE b.apartment_id = $1
              AND ($2::bill_type IS NULL OR b.bill_type = $2)
              AND NOT EXISTS (SELECT 1 FROM payments p WHERE p.bill_id = b.id)
            ORDER BY b.created_at ASC, b.id ASC
            "#,
        )
        .bind(apartment_id)
        .bind(bill_type.map(BillTypeDb::from))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_db_error)?
            .into_iter()
            .map(Bill::from)
            .collect())
    }

    async fn list_for_apartment(&self, apartment_id: i64) -> RepoResult<Vec<Bill>> {
        let timer = QueryTimer::new("list_bills_for_apartment");
        let result = sqlx::query_as::<_, BillEntity>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE apartment_id = $1 ORDER BY due_date DESC, id DESC"
        ))
        .bind(apartment_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result
            .map_err(map_db_error)?
            .into_iter()
            .map(Bill::from)
            .collect())
    }

    async fn update_undivided(&self, bill_id: i64, bill: NewBill) -> RepoResult<Option<Bill>> {
        let timer = QueryTimer::new("update_undivided_bill");
        let result = sqlx::query_as::<_, BillEntity>(&format!(
            r#"
            UPDATE bills
            SET bill_type = $2, total_amount_cents = $3, due_date = $4,
                billing_deadline = $5, description = $6, updated_at = NOW()
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM payments p WHERE p.bill_id = bills.id)
            RETURNING {BILL_COLUMNS}
            "#
        ))
        .bind(bill_id)
        .bind(BillTypeDb::from(bill.bill_type))
        .bind(bill.total_amount_cents)
        .bind(bill.due_date)
        .bind(bill.billing_deadline)
        .bind(&bill.description)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(map_db_error)?.map(Bill::from))
    }

    async fn delete_unless_paid(&self, bill_id: i64) -> RepoResult<Option<bool>> {
        let timer = QueryTimer::new("delete_unpaid_bill");
        let deleted = sqlx::query(
            r#"
            DELETE FROM bills
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM payments p WHERE p.bill_id = $1 AND p.status = 'paid'
              )
            "#,
        )
        .bind(bill_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?
        .rows_affected();
        if deleted > 0 {
            timer.record();
            return Ok(Some(true));
        }

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM bills WHERE id = $1)")
            .bind(bill_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        timer.record();
        Ok(exists.then_some(false))
    }
}
