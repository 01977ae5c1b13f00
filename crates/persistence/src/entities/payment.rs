//! Payment entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{Bill, Payment, PaymentHistoryEntry, PaymentStatus};
use sqlx::FromRow;

use super::bill::BillTypeDb;

/// Database enum for `payment_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatusDb {
    Pending,
    Paid,
    Failed,
}

impl From<PaymentStatusDb> for PaymentStatus {
    fn from(value: PaymentStatusDb) -> Self {
        match value {
            PaymentStatusDb::Pending => Self::Pending,
            PaymentStatusDb::Paid => Self::Paid,
            PaymentStatusDb::Failed => Self::Failed,
        }
    }
}

/// Database row mapping for the payments table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentEntity {
    pub id: i64,
    pub bill_id: i64,
    pub user_id: i64,
    pub amount_cents: i64,
    pub status: PaymentStatusDb,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentEntity> for Payment {
    fn from(entity: PaymentEntity) -> Self {
        Self {
            id: entity.id,
            bill_id: entity.bill_id,
            user_id: entity.user_id,
            amount_cents: entity.amount_cents,
            status: entity.status.into(),
            paid_at: entity.paid_at,
            created_at: entity.created_at,
        }
    }
}

/// A payment joined with its bill and apartment for the history view.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentHistoryRow {
    pub payment_id: i64,
    pub bill_id: i64,
    pub user_id: i64,
    pub amount_cents: i64,
    pub status: PaymentStatusDb,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_created_at: DateTime<Utc>,
    pub apartment_id: i64,
    pub bill_type: BillTypeDb,
    pub total_amount_cents: i64,
    pub due_date: NaiveDate,
    pub billing_deadline: Option<NaiveDate>,
    pub description: Option<String>,
    pub bill_created_at: DateTime<Utc>,
    pub apartment_name: String,
}

impl From<PaymentHistoryRow> for PaymentHistoryEntry {
    fn from(row: PaymentHistoryRow) -> Self {
        Self {
            payment: Payment {
                id: row.payment_id,
                bill_id: row.bill_id,
                user_id: row.user_id,
                amount_cents: row.amount_cents,
                status: row.status.into(),
                paid_at: row.paid_at,
                created_at: row.payment_created_at,
            },
            bill: Bill {
                id: row.bill_id,
                apartment_id: row.apartment_id,
                bill_type: row.bill_type.into(),
                total_amount_cents: row.total_amount_cents,
                due_date: row.due_date,
                billing_deadline: row.billing_deadline,
                description: row.description,
                created_at: row.bill_created_at,
            },
            apartment_name: row.apartment_name,
        }
    }
}
